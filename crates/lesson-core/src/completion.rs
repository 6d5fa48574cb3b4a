//! "Mark lesson as complete" state for the signed-in user.

use crate::auth::{AuthChange, AuthUser};
use crate::store::ProgressStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LessonCompletion {
    store: Arc<dyn ProgressStore>,
    user: Option<AuthUser>,
    completed: BTreeSet<String>,
}

impl LessonCompletion {
    pub fn new(store: Arc<dyn ProgressStore>, user: Option<AuthUser>) -> Self {
        let mut completion = Self {
            store,
            user: None,
            completed: BTreeSet::new(),
        };
        completion.set_user(user);
        completion
    }

    pub fn is_completed(&self, lesson_id: &str) -> bool {
        self.user.is_some() && self.completed.contains(lesson_id)
    }

    /// Flip the lesson's state and return the new one. Anonymous visitors
    /// always get `false` and nothing is stored.
    pub fn toggle_complete(&mut self, lesson_id: &str) -> bool {
        let Some(user) = &self.user else {
            debug!(lesson_id, "Ignoring completion toggle for anonymous visitor");
            return false;
        };

        let now_completed = if self.completed.remove(lesson_id) {
            false
        } else {
            self.completed.insert(lesson_id.to_string());
            true
        };
        if let Err(err) = self.store.save_completed(&user.id, &self.completed) {
            warn!(lesson_id, "Failed to persist completed lessons: {err:#}");
        }
        now_completed
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn apply_auth_change(&mut self, change: &AuthChange) {
        match change {
            AuthChange::SignedIn(user) => self.set_user(Some(user.clone())),
            AuthChange::SignedOut => self.set_user(None),
        }
    }

    fn set_user(&mut self, user: Option<AuthUser>) {
        self.completed = match &user {
            Some(user) => self.store.load_completed(&user.id).unwrap_or_else(|err| {
                warn!("Failed to load completed lessons: {err:#}");
                BTreeSet::new()
            }),
            None => BTreeSet::new(),
        };
        self.user = user;
    }
}
