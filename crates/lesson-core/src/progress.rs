//! Per-user, per-lesson known-word tracking and learning progress.
//!
//! A word is either known (present in the set) or unknown (absent). Progress
//! is only meaningful for a signed-in user; anonymous visitors get no
//! progress at all and their mark-known clicks are ignored.

use crate::auth::{AuthChange, AuthUser};
use crate::store::{KnownWords, ProgressStore};
use crate::vocabulary::Vocabulary;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct Progress {
    pub known: usize,
    pub total: usize,
    pub ratio: f64,
}

impl Progress {
    /// `total` counts vocabulary words with a non-blank translation, `known`
    /// counts those present in `known_words`. The ratio is 0 for an empty
    /// vocabulary.
    pub fn compute(vocabulary: &Vocabulary, known_words: &KnownWords) -> Self {
        let mut total = 0usize;
        let mut known = 0usize;
        for word in vocabulary.glossed_words() {
            total += 1;
            if known_words.contains(word) {
                known += 1;
            }
        }
        let ratio = if total == 0 {
            0.0
        } else {
            known as f64 / total as f64
        };
        Self {
            known,
            total,
            ratio,
        }
    }

    pub fn percent(&self) -> f64 {
        (self.ratio * 100.0).round()
    }
}

pub struct WordKnowledgeTracker {
    lesson_id: String,
    store: Arc<dyn ProgressStore>,
    user: Option<AuthUser>,
    known: KnownWords,
}

impl std::fmt::Debug for WordKnowledgeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordKnowledgeTracker")
            .field("lesson_id", &self.lesson_id)
            .field("user", &self.user)
            .field("known", &self.known)
            .finish()
    }
}

impl WordKnowledgeTracker {
    pub fn new(
        lesson_id: impl Into<String>,
        store: Arc<dyn ProgressStore>,
        user: Option<AuthUser>,
    ) -> Self {
        let mut tracker = Self {
            lesson_id: lesson_id.into(),
            store,
            user: None,
            known: KnownWords::new(),
        };
        tracker.set_user(user);
        tracker
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.user.is_some()
    }

    pub fn known_words(&self) -> &KnownWords {
        &self.known
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.user.is_some() && self.known.contains(word)
    }

    /// Mark `word` known or unknown and persist the whole set. Ignored
    /// without a signed-in user.
    pub fn set_known(&mut self, word: &str, is_known: bool) {
        let Some(user) = &self.user else {
            debug!(word, "Ignoring known-word change for anonymous visitor");
            return;
        };

        let changed = if is_known {
            self.known.insert(word.to_string())
        } else {
            self.known.remove(word)
        };
        debug!(word, is_known, changed, lesson = %self.lesson_id, "Known-word state updated");

        if let Err(err) = self.store.save_known(&user.id, &self.lesson_id, &self.known) {
            warn!(lesson = %self.lesson_id, "Failed to persist known words: {err:#}");
        }
    }

    /// Progress for the signed-in user; `None` when anonymous.
    pub fn progress(&self, vocabulary: &Vocabulary) -> Option<Progress> {
        self.user
            .as_ref()
            .map(|_| Progress::compute(vocabulary, &self.known))
    }

    pub fn apply_auth_change(&mut self, change: &AuthChange) {
        match change {
            AuthChange::SignedIn(user) => self.set_user(Some(user.clone())),
            AuthChange::SignedOut => self.set_user(None),
        }
    }

    /// Switch identity. Signing out only clears working memory; the stored
    /// set stays on disk for the next session.
    fn set_user(&mut self, user: Option<AuthUser>) {
        self.known = match &user {
            Some(user) => match self.store.load_known(&user.id, &self.lesson_id) {
                Ok(words) => words,
                Err(err) => {
                    warn!(lesson = %self.lesson_id, "Failed to load known words: {err:#}");
                    KnownWords::new()
                }
            },
            None => KnownWords::new(),
        };
        self.user = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProgressStore;
    use proptest::prelude::*;

    fn user() -> AuthUser {
        AuthUser {
            id: "u1".to_string(),
            username: "ana".to_string(),
        }
    }

    fn vocabulary(words: &[&str]) -> Vocabulary {
        words.iter().map(|word| (*word, "x")).collect()
    }

    #[test]
    fn toggling_known_state() {
        let store = Arc::new(MemoryProgressStore::default());
        let mut tracker = WordKnowledgeTracker::new("1", store.clone(), Some(user()));

        tracker.set_known("мир", true);
        assert!(tracker.is_known("мир"));

        tracker.set_known("мир", false);
        assert!(!tracker.is_known("мир"));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn marks_persist_after_a_corrupt_progress_file() {
        use crate::store::FileProgressStore;
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileProgressStore::new(dir.path()));
        let path = store.user_dir("u1").join("known_words.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[oops").unwrap();

        let mut tracker = WordKnowledgeTracker::new("1", store.clone(), Some(user()));
        assert!(tracker.known_words().is_empty());
        tracker.set_known("мир", true);

        let reopened = WordKnowledgeTracker::new("1", store, Some(user()));
        assert!(reopened.is_known("мир"));
    }

    #[test]
    fn anonymous_changes_are_ignored_and_not_persisted() {
        let store = Arc::new(MemoryProgressStore::default());
        let mut tracker = WordKnowledgeTracker::new("1", store.clone(), None);

        tracker.set_known("мир", true);

        assert!(!tracker.is_known("мир"));
        assert_eq!(store.write_count(), 0);
        assert_eq!(tracker.progress(&vocabulary(&["мир"])), None);
    }

    #[test]
    fn one_of_four_known() {
        let store = Arc::new(MemoryProgressStore::default());
        let mut tracker = WordKnowledgeTracker::new("1", store, Some(user()));
        tracker.set_known("два", true);

        let progress = tracker
            .progress(&vocabulary(&["один", "два", "три", "четыре"]))
            .unwrap();

        assert_eq!(
            progress,
            Progress {
                known: 1,
                total: 4,
                ratio: 0.25
            }
        );
        assert_eq!(progress.percent(), 25.0);
    }

    #[test]
    fn empty_vocabulary_has_zero_ratio() {
        let progress = Progress::compute(&Vocabulary::new(), &KnownWords::new());
        assert_eq!(progress.total, 0);
        assert_eq!(progress.ratio, 0.0);
    }

    #[test]
    fn known_words_outside_vocabulary_do_not_count() {
        let known: KnownWords = ["мир".to_string(), "дом".to_string()].into();
        let progress = Progress::compute(&vocabulary(&["мир", "да"]), &known);
        assert_eq!((progress.known, progress.total), (1, 2));
    }

    #[test]
    fn blank_translations_do_not_count_toward_total() {
        let mut vocab = vocabulary(&["мир"]);
        vocab.upsert("да", "");
        let known: KnownWords = ["да".to_string()].into();
        let progress = Progress::compute(&vocab, &known);
        assert_eq!((progress.known, progress.total), (0, 1));
    }

    #[test]
    fn known_set_is_restored_for_the_same_user_and_lesson() {
        let store = Arc::new(MemoryProgressStore::default());
        WordKnowledgeTracker::new("1", store.clone(), Some(user())).set_known("мир", true);

        let same_lesson = WordKnowledgeTracker::new("1", store.clone(), Some(user()));
        let other_lesson = WordKnowledgeTracker::new("2", store, Some(user()));

        assert!(same_lesson.is_known("мир"));
        assert!(!other_lesson.is_known("мир"));
    }

    #[test]
    fn sign_out_clears_memory_but_not_storage() {
        let store = Arc::new(MemoryProgressStore::default());
        let mut tracker = WordKnowledgeTracker::new("1", store.clone(), Some(user()));
        tracker.set_known("мир", true);

        tracker.apply_auth_change(&AuthChange::SignedOut);
        assert!(tracker.known_words().is_empty());
        assert!(!tracker.is_tracking());

        tracker.apply_auth_change(&AuthChange::SignedIn(user()));
        assert!(tracker.is_known("мир"));
    }

    proptest! {
        #[test]
        fn ratio_stays_within_bounds(
            vocab_words in proptest::collection::btree_set("[а-я]{1,6}", 0..12),
            known_words in proptest::collection::btree_set("[а-я]{1,6}", 0..12),
        ) {
            let vocab: Vocabulary = vocab_words.iter().map(|word| (word.as_str(), "t")).collect();
            let progress = Progress::compute(&vocab, &known_words);
            prop_assert!(progress.ratio >= 0.0 && progress.ratio <= 1.0);
            prop_assert!(progress.known <= progress.total);
            prop_assert_eq!(progress.total, vocab_words.len());
        }
    }
}
