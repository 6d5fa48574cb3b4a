//! Lesson records as handed over by the content repository.

use crate::vocabulary::Vocabulary;
use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A single lesson. Read-only from the point of view of the overlay engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Content repositories hand out either numeric or string ids.
    #[serde(deserialize_with = "deserialize_lesson_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub vocabulary: Vocabulary,
    #[serde(default)]
    pub translation_fa: Option<String>,
    #[serde(default)]
    pub audio_src: Option<String>,
    #[serde(default)]
    pub audio_start_time: Option<f64>,
    #[serde(default)]
    pub audio_end_time: Option<f64>,
}

impl Lesson {
    /// Curated full-text translation, if the author supplied a non-blank one.
    pub fn curated_translation(&self) -> Option<&str> {
        self.translation_fa
            .as_deref()
            .filter(|translation| !translation.trim().is_empty())
    }
}

fn deserialize_lesson_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) if id.is_u64() || id.is_i64() => Ok(id.to_string()),
        other => Err(D::Error::custom(format!(
            "lesson id must be a string or an integer, got {other}"
        ))),
    }
}

pub fn parse_lesson(contents: &str) -> Result<Lesson> {
    let lesson: Lesson = serde_json::from_str(contents).context("Parsing lesson JSON")?;
    debug!(
        id = %lesson.id,
        chars = lesson.text.chars().count(),
        vocabulary = lesson.vocabulary.len(),
        "Parsed lesson"
    );
    Ok(lesson)
}

pub fn load_lesson(path: &Path) -> Result<Lesson> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Reading lesson file {}", path.display()))?;
    let lesson = parse_lesson(&contents)?;
    info!(path = %path.display(), id = %lesson.id, "Loaded lesson");
    Ok(lesson)
}
