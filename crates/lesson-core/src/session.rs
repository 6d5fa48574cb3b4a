//! One open lesson, driven by commands from a view.
//!
//! A [`LessonSession`] owns the overlay, the known-word tracker, completion
//! state, the audio window controller and the translation assistant for a
//! single lesson. Every command returns a fresh [`LessonSnapshot`]; the media
//! path has a cheaper entry point that only reports seeks.

use crate::assist::{
    AssistDispatcher, AssistOutcome, AssistReply, AssistRequest, AssistResult,
    TranslationAssistant,
};
use crate::audio::{MediaAction, MediaEvent, PlaybackWindow, SegmentedAudioController};
use crate::auth::{AuthContext, AuthSubscription, AuthUser};
use crate::completion::LessonCompletion;
use crate::lesson::Lesson;
use crate::normalizer::normalize_word;
use crate::overlay::{GlossedSegment, VocabularyOverlay, WordPopup};
use crate::progress::{Progress, WordKnowledgeTracker};
use crate::store::ProgressStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum TranslationPanel {
    #[default]
    Idle,
    Loading,
    Ready {
        text: String,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum PronunciationPanel {
    #[default]
    Idle,
    Loading {
        word: String,
    },
    Ready {
        word: String,
        translation: String,
        phonetic: String,
        audio_data_uri: String,
    },
    Failed {
        word: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct LessonSnapshot {
    pub lesson_id: String,
    pub title: String,
    pub user: Option<AuthUser>,
    pub segments: Vec<GlossedSegment>,
    pub selected_word: Option<WordPopup>,
    /// Absent for anonymous visitors.
    pub progress: Option<Progress>,
    /// Absent for anonymous visitors.
    pub completed: Option<bool>,
    pub translation: TranslationPanel,
    pub pronunciation: PronunciationPanel,
    pub audio_src: Option<String>,
    pub audio_window: Option<PlaybackWindow>,
}

#[derive(Debug, Clone)]
pub enum LessonCommand {
    GetSnapshot,
    WordClicked { segment_idx: usize },
    DismissWord,
    MarkKnown { word: String },
    MarkUnknown { word: String },
    ToggleComplete,
    RequestTranslation,
    PronounceSelected,
    Media(MediaEvent),
}

impl LessonCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "lesson_get_snapshot",
            Self::WordClicked { .. } => "lesson_word_clicked",
            Self::DismissWord => "lesson_dismiss_word",
            Self::MarkKnown { .. } => "lesson_mark_known",
            Self::MarkUnknown { .. } => "lesson_mark_unknown",
            Self::ToggleComplete => "lesson_toggle_complete",
            Self::RequestTranslation => "lesson_request_translation",
            Self::PronounceSelected => "lesson_pronounce_selected",
            Self::Media(_) => "lesson_media_event",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LessonEvent {
    pub action: &'static str,
    pub snapshot: LessonSnapshot,
    /// Position the media element must seek to, if any.
    pub seek_to: Option<f64>,
}

/// One lesson open in a view.
pub struct LessonSession {
    lesson: Lesson,
    overlay: VocabularyOverlay,
    tracker: WordKnowledgeTracker,
    completion: LessonCompletion,
    audio: SegmentedAudioController,
    auth: AuthContext,
    auth_subscription: AuthSubscription,
    assist: AssistDispatcher,
    translation: TranslationPanel,
    pending_translation: Option<u64>,
    pronunciation: PronunciationPanel,
    pending_pronunciation: Option<u64>,
}

impl LessonSession {
    pub fn new(
        lesson: Lesson,
        auth: AuthContext,
        store: Arc<dyn ProgressStore>,
        assistant: TranslationAssistant,
    ) -> Self {
        let user = auth.current_user();
        let auth_subscription = auth.subscribe();
        info!(
            lesson = %lesson.id,
            signed_in = user.is_some(),
            vocabulary = lesson.vocabulary.len(),
            "Opening lesson session"
        );
        Self {
            overlay: VocabularyOverlay::new(&lesson.text, &lesson.vocabulary),
            tracker: WordKnowledgeTracker::new(lesson.id.clone(), Arc::clone(&store), user.clone()),
            completion: LessonCompletion::new(store, user),
            audio: SegmentedAudioController::new(lesson.audio_start_time, lesson.audio_end_time),
            auth,
            auth_subscription,
            assist: AssistDispatcher::new(assistant),
            translation: TranslationPanel::Idle,
            pending_translation: None,
            pronunciation: PronunciationPanel::Idle,
            pending_pronunciation: None,
            lesson,
        }
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn audio(&self) -> &SegmentedAudioController {
        &self.audio
    }

    pub fn apply_command(&mut self, command: LessonCommand) -> LessonEvent {
        let action = command.action();
        self.sync_auth();
        self.poll_assist();

        let mut seek_to = None;
        match command {
            LessonCommand::GetSnapshot => {}
            LessonCommand::WordClicked { segment_idx } => self.word_clicked(segment_idx),
            LessonCommand::DismissWord => self.overlay.dismiss(),
            LessonCommand::MarkKnown { word } => self.set_known(&word, true),
            LessonCommand::MarkUnknown { word } => self.set_known(&word, false),
            LessonCommand::ToggleComplete => {
                self.completion.toggle_complete(&self.lesson.id);
            }
            LessonCommand::RequestTranslation => self.request_translation(),
            LessonCommand::PronounceSelected => self.pronounce_selected(),
            LessonCommand::Media(event) => seek_to = self.media_event(event),
        }

        LessonEvent {
            action,
            snapshot: self.snapshot(),
            seek_to,
        }
    }

    /// Feed a media element event to the audio window controller and return
    /// the position to seek to, if any. Skips building a snapshot.
    pub fn media_event(&mut self, event: MediaEvent) -> Option<f64> {
        self.audio
            .transition(event)
            .into_iter()
            .map(|MediaAction::Seek(position)| position)
            .last()
    }

    pub fn snapshot(&self) -> LessonSnapshot {
        let signed_in = self.tracker.is_tracking();
        LessonSnapshot {
            lesson_id: self.lesson.id.clone(),
            title: self.lesson.title.clone(),
            user: self.tracker.user().cloned(),
            segments: self.overlay.segments().to_vec(),
            selected_word: self.overlay.popup(&self.tracker),
            progress: self.tracker.progress(&self.lesson.vocabulary),
            completed: signed_in.then(|| self.completion.is_completed(&self.lesson.id)),
            translation: self.translation.clone(),
            pronunciation: self.pronunciation.clone(),
            audio_src: self.lesson.audio_src.clone(),
            audio_window: self.audio.window(),
        }
    }

    /// Apply identity changes published since the last command.
    pub fn sync_auth(&mut self) {
        for change in self.auth_subscription.drain() {
            debug!(?change, lesson = %self.lesson.id, "Applying auth change");
            self.tracker.apply_auth_change(&change);
            self.completion.apply_auth_change(&change);
        }
    }

    /// Fold finished assistant replies into the view state.
    pub fn poll_assist(&mut self) {
        for reply in self.assist.poll() {
            self.apply_reply(reply);
        }
    }

    /// Block until one assistant reply arrives. Returns false on timeout.
    pub fn wait_for_assist(&mut self, timeout: Duration) -> bool {
        match self.assist.wait(timeout) {
            Some(reply) => {
                self.apply_reply(reply);
                true
            }
            None => false,
        }
    }

    pub fn is_assist_pending(&self) -> bool {
        self.pending_translation.is_some() || self.pending_pronunciation.is_some()
    }

    fn word_clicked(&mut self, segment_idx: usize) {
        if self.overlay.activate(segment_idx).is_some() {
            self.pronunciation = PronunciationPanel::Idle;
            self.pending_pronunciation = None;
        }
    }

    fn set_known(&mut self, word: &str, is_known: bool) {
        let word = normalize_word(word);
        if word.is_empty() {
            return;
        }
        self.tracker.set_known(&word, is_known);
    }

    fn request_translation(&mut self) {
        if let Some(curated) = self.lesson.curated_translation() {
            self.translation = TranslationPanel::Ready {
                text: curated.to_string(),
            };
            return;
        }
        if self.pending_translation.is_some() {
            debug!(lesson = %self.lesson.id, "Translation already in flight");
            return;
        }
        let request_id = self.assist.submit(AssistRequest::TranslateText {
            text: self.lesson.text.clone(),
            hints: self.lesson.vocabulary.clone(),
        });
        self.pending_translation = Some(request_id);
        self.translation = TranslationPanel::Loading;
    }

    fn pronounce_selected(&mut self) {
        let Some(word) = self.overlay.selected_word().map(str::to_string) else {
            return;
        };
        let request_id = self
            .assist
            .submit(AssistRequest::PronounceWord { word: word.clone() });
        self.pending_pronunciation = Some(request_id);
        self.pronunciation = PronunciationPanel::Loading { word };
    }

    fn apply_reply(&mut self, reply: AssistReply) {
        let AssistReply { request_id, result } = reply;
        match result {
            AssistResult::Text(outcome) => {
                if self.pending_translation != Some(request_id) {
                    debug!(request_id, "Ignoring stale translation reply");
                    return;
                }
                self.pending_translation = None;
                self.translation = match outcome {
                    AssistOutcome::Ready(text) => TranslationPanel::Ready { text },
                    AssistOutcome::Fallback(message) => TranslationPanel::Failed { message },
                };
            }
            AssistResult::Word { word, outcome } => {
                if self.pending_pronunciation != Some(request_id) {
                    debug!(request_id, %word, "Ignoring stale pronunciation reply");
                    return;
                }
                self.pending_pronunciation = None;
                self.pronunciation = match outcome {
                    AssistOutcome::Ready(pronunciation) => PronunciationPanel::Ready {
                        audio_data_uri: pronunciation.audio_data_uri(),
                        translation: pronunciation.translation,
                        phonetic: pronunciation.phonetic,
                        word,
                    },
                    AssistOutcome::Fallback(message) => PronunciationPanel::Failed { word, message },
                };
            }
        }
    }
}

impl Drop for LessonSession {
    fn drop(&mut self) {
        self.auth.unsubscribe(self.auth_subscription.id());
    }
}
