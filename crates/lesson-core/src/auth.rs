//! Authentication context shared by every lesson view.
//!
//! Components never read the identity from ambient state. They receive an
//! [`AuthContext`] and subscribe to it; changes coming from another view (the
//! equivalent of a storage event from a second tab) arrive through
//! [`AuthContext::sync`] and are fanned out to every live subscription.

use crate::store::ProgressStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(AuthUser),
    SignedOut,
}

pub type SubscriptionId = u64;

/// Receiving end of a subscription. Dropping it is equivalent to
/// unsubscribing; the sender is pruned on the next notification.
#[derive(Debug)]
pub struct AuthSubscription {
    id: SubscriptionId,
    changes: Receiver<AuthChange>,
}

impl AuthSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Pending changes, oldest first.
    pub fn drain(&self) -> Vec<AuthChange> {
        self.changes.try_iter().collect()
    }
}

#[derive(Default)]
struct AuthInner {
    user: Option<AuthUser>,
    subscribers: Vec<(SubscriptionId, Sender<AuthChange>)>,
    next_id: SubscriptionId,
}

#[derive(Clone, Default)]
pub struct AuthContext {
    inner: Arc<Mutex<AuthInner>>,
    store: Option<Arc<dyn ProgressStore>>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &self.inner.lock().user)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl AuthContext {
    /// Context without persistence; starts anonymous.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context backed by a store; restores the last signed-in identity.
    pub fn with_store(store: Arc<dyn ProgressStore>) -> Self {
        let user = match store.load_current_user() {
            Ok(user) => user,
            Err(err) => {
                warn!("Failed to restore signed-in user: {err:#}");
                None
            }
        };
        if let Some(user) = &user {
            info!(user = %user.username, "Restored signed-in user");
        }
        Self {
            inner: Arc::new(Mutex::new(AuthInner {
                user,
                ..AuthInner::default()
            })),
            store: Some(store),
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner.lock().user.clone()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.subscribers.push((id, tx));
        debug!(id, "Auth subscription added");
        AuthSubscription { id, changes: rx }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.retain(|(sub_id, _)| *sub_id != id);
        debug!(id, "Auth subscription removed");
    }

    pub fn login(&self, user: AuthUser) {
        info!(user = %user.username, "User signed in");
        self.persist(Some(&user));
        self.apply(Some(user));
    }

    pub fn logout(&self) {
        info!("User signed out");
        self.persist(None);
        self.apply(None);
    }

    /// Adopt an identity written by another view. Only notifies when the
    /// identity actually changed.
    pub fn sync(&self, user: Option<AuthUser>) {
        self.apply(user);
    }

    fn apply(&self, user: Option<AuthUser>) {
        let mut inner = self.inner.lock();
        if inner.user == user {
            return;
        }
        let change = match &user {
            Some(user) => AuthChange::SignedIn(user.clone()),
            None => AuthChange::SignedOut,
        };
        inner.user = user;
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(change.clone()).is_ok());
    }

    fn persist(&self, user: Option<&AuthUser>) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_current_user(user) {
            warn!("Failed to persist signed-in user: {err:#}");
        }
    }
}
