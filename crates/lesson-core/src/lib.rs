//! Reading-lesson core: per-word translation overlay, known-word progress,
//! lesson completion and segment-bounded audio playback.

pub mod assist;
pub mod audio;
pub mod auth;
pub mod completion;
pub mod config;
pub mod lesson;
pub mod normalizer;
pub mod overlay;
pub mod progress;
pub mod session;
pub mod store;
pub mod text_utils;
pub mod vocabulary;

pub use audio::{MediaAction, MediaEvent, SegmentedAudioController};
pub use auth::{AuthContext, AuthUser};
pub use lesson::{Lesson, load_lesson};
pub use session::{LessonCommand, LessonEvent, LessonSession, LessonSnapshot};
pub use store::{FileProgressStore, MemoryProgressStore, ProgressStore};
pub use vocabulary::Vocabulary;
