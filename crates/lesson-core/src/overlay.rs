//! Per-word translation overlay on top of lesson text.
//!
//! Two flavours share the same segmentation:
//! - [`VocabularyEditor`] is the authoring side: clicking any word opens an
//!   editable binding and saving upserts into a local copy of the vocabulary
//!   that is serialized when the surrounding form is submitted.
//! - [`VocabularyOverlay`] is the viewing side: clicking a glossed word shows
//!   its translation and, for a signed-in user, the known/unknown actions.

use crate::normalizer::normalize_word;
use crate::progress::WordKnowledgeTracker;
use crate::text_utils::tokenize;
use crate::vocabulary::Vocabulary;
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct GlossedSegment {
    /// Original text of the segment, spacing included.
    pub text: String,
    /// Normalized key; `None` for separators and punctuation-only runs.
    pub word: Option<String>,
    pub translation: Option<String>,
}

impl GlossedSegment {
    pub fn is_word(&self) -> bool {
        self.word.is_some()
    }

    pub fn is_glossed(&self) -> bool {
        self.translation.is_some()
    }
}

/// Translation for a raw segment, if any.
pub fn lookup<'v>(segment: &str, vocabulary: &'v Vocabulary) -> Option<&'v str> {
    vocabulary.lookup(segment)
}

/// Tokenize `text` and resolve each segment against `vocabulary`.
pub fn gloss(text: &str, vocabulary: &Vocabulary) -> Vec<GlossedSegment> {
    tokenize(text)
        .into_iter()
        .map(|segment| {
            let key = normalize_word(&segment);
            let (word, translation) = if key.is_empty() {
                (None, None)
            } else {
                let translation = vocabulary.translation(&key).map(str::to_string);
                (Some(key), translation)
            };
            GlossedSegment {
                text: segment,
                word,
                translation,
            }
        })
        .collect()
}

/// Editable translation for one normalized word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBinding {
    pub word: String,
    pub draft: String,
    /// Whether the vocabulary already had an entry (possibly blank).
    pub existed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyEditor {
    vocabulary: Vocabulary,
    binding: Option<WordBinding>,
}

impl VocabularyEditor {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            binding: None,
        }
    }

    /// Open a binding for the clicked segment. Segments that normalize to
    /// nothing are not words and open nothing.
    pub fn activate(&mut self, segment: &str) -> Option<&WordBinding> {
        let word = normalize_word(segment);
        if word.is_empty() {
            return None;
        }
        let existing = self.vocabulary.entry(&word);
        let binding = WordBinding {
            draft: existing.unwrap_or_default().to_string(),
            existed: existing.is_some(),
            word,
        };
        debug!(word = %binding.word, existed = binding.existed, "Opened vocabulary binding");
        self.binding = Some(binding);
        self.binding.as_ref()
    }

    pub fn binding(&self) -> Option<&WordBinding> {
        self.binding.as_ref()
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        if let Some(binding) = &mut self.binding {
            binding.draft = draft.into();
        }
    }

    /// Commit the open binding, even when the draft is empty. Returns the
    /// saved word.
    pub fn save(&mut self) -> Option<String> {
        let binding = self.binding.take()?;
        self.save_translation(&binding.word, binding.draft);
        Some(binding.word)
    }

    pub fn cancel(&mut self) {
        self.binding = None;
    }

    /// Upsert a translation for an already-normalized word.
    pub fn save_translation(&mut self, word: &str, translation: impl Into<String>) {
        let translation = translation.into();
        debug!(word, blank = translation.trim().is_empty(), "Saved vocabulary entry");
        self.vocabulary.upsert(word, translation);
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn into_vocabulary(self) -> Vocabulary {
        self.vocabulary
    }

    /// Value of the hidden form field that carries the vocabulary.
    pub fn serialized(&self) -> anyhow::Result<String> {
        self.vocabulary.to_json_string()
    }

    pub fn preview(&self, text: &str) -> Vec<GlossedSegment> {
        gloss(text, &self.vocabulary)
    }
}

/// What the viewer shows for a clicked glossed word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct WordPopup {
    pub word: String,
    pub translation: String,
    /// Known flag when progress tracking is active; `None` hides the
    /// mark-known / mark-unknown actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub is_known: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyOverlay {
    segments: Vec<GlossedSegment>,
    selected: Option<usize>,
}

impl VocabularyOverlay {
    pub fn new(text: &str, vocabulary: &Vocabulary) -> Self {
        Self {
            segments: gloss(text, vocabulary),
            selected: None,
        }
    }

    pub fn segments(&self) -> &[GlossedSegment] {
        &self.segments
    }

    /// Select a segment by index. Only glossed words can be selected.
    pub fn activate(&mut self, segment_idx: usize) -> Option<&GlossedSegment> {
        let segment = self.segments.get(segment_idx)?;
        if !segment.is_glossed() {
            debug!(segment_idx, "Ignoring click on segment without translation");
            return None;
        }
        self.selected = Some(segment_idx);
        self.segments.get(segment_idx)
    }

    pub fn dismiss(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&GlossedSegment> {
        self.selected.and_then(|idx| self.segments.get(idx))
    }

    pub fn selected_word(&self) -> Option<&str> {
        self.selected().and_then(|segment| segment.word.as_deref())
    }

    pub fn popup(&self, tracker: &WordKnowledgeTracker) -> Option<WordPopup> {
        let segment = self.selected()?;
        let word = segment.word.clone()?;
        let translation = segment.translation.clone()?;
        let is_known = tracker
            .is_tracking()
            .then(|| tracker.is_known(&word));
        Some(WordPopup {
            word,
            translation,
            is_known,
        })
    }

    /// Mark the selected word known or unknown. Returns the word when there
    /// was a selection; the tracker ignores the change for anonymous users.
    pub fn mark_selected(
        &self,
        tracker: &mut WordKnowledgeTracker,
        is_known: bool,
    ) -> Option<String> {
        let word = self.selected_word()?.to_string();
        tracker.set_known(&word, is_known);
        Some(word)
    }
}
