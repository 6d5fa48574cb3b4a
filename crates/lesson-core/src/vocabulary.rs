//! Lesson-scoped dictionary from normalized words to translations.
//!
//! The persisted field is a loosely typed JSON object. Only string values are
//! accepted when it is read back; anything else is dropped with a warning so
//! the overlay never sees a malformed entry.

use crate::normalizer::normalize_word;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Vocabulary {
    entries: BTreeMap<String, String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an untyped JSON value, keeping only string translations.
    pub fn from_json_value(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(map) = value else {
            if !value.is_null() {
                warn!("Ignoring vocabulary that is not a JSON object");
            }
            return Self::default();
        };

        let mut entries = BTreeMap::new();
        for (word, translation) in map {
            match translation {
                serde_json::Value::String(translation) => {
                    entries.insert(word, translation);
                }
                other => {
                    warn!(%word, kind = json_kind(&other), "Dropping non-string vocabulary entry");
                }
            }
        }
        Self { entries }
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Pretty JSON form, used as translation hints.
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Raw entry for an already-normalized key, blank translations included.
    pub fn entry(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    pub fn contains_entry(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Translation for an already-normalized key. Blank translations count as
    /// missing.
    pub fn translation(&self, word: &str) -> Option<&str> {
        self.entry(word).filter(|translation| !translation.trim().is_empty())
    }

    /// Normalize a raw segment and resolve its translation.
    pub fn lookup(&self, segment: &str) -> Option<&str> {
        let key = normalize_word(segment);
        if key.is_empty() {
            return None;
        }
        self.translation(&key)
    }

    /// Insert or replace an entry. The key is stored as given.
    pub fn upsert(&mut self, word: impl Into<String>, translation: impl Into<String>) {
        self.entries.insert(word.into(), translation.into());
    }

    pub fn remove(&mut self, word: &str) -> Option<String> {
        self.entries.remove(word)
    }

    /// Keys that carry a non-blank translation.
    pub fn glossed_words(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, translation)| !translation.trim().is_empty())
            .map(|(word, _)| word.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(word, translation)| (word.as_str(), translation.as_str()))
    }
}

impl<'de> Deserialize<'de> for Vocabulary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json_value(value))
    }
}

impl<K, V> FromIterator<(K, V)> for Vocabulary
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(word, translation)| (word.into(), translation.into()))
                .collect(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_normalizes_the_segment() {
        let vocabulary: Vocabulary = [("привет", "hello")].into_iter().collect();
        assert_eq!(vocabulary.lookup("Привет,"), Some("hello"));
        assert_eq!(vocabulary.lookup("мир"), None);
        assert_eq!(vocabulary.lookup(" , "), None);
    }

    #[test]
    fn non_string_values_are_dropped_at_the_boundary() {
        let vocabulary = Vocabulary::from_json_value(json!({
            "мир": "world",
            "два": 2,
            "три": null,
            "дом": ["house"],
        }));
        assert_eq!(vocabulary.len(), 1);
        assert_eq!(vocabulary.lookup("мир"), Some("world"));
        assert_eq!(vocabulary.lookup("два"), None);
    }

    #[test]
    fn non_object_vocabulary_is_empty() {
        assert!(Vocabulary::from_json_value(json!(["мир"])).is_empty());
        assert!(Vocabulary::from_json_value(json!(null)).is_empty());
    }

    #[test]
    fn blank_translation_is_an_entry_without_a_gloss() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.upsert("мир", "");
        assert!(vocabulary.contains_entry("мир"));
        assert_eq!(vocabulary.entry("мир"), Some(""));
        assert_eq!(vocabulary.lookup("мир"), None);
        assert_eq!(vocabulary.glossed_words().count(), 0);
    }

    #[test]
    fn serializes_as_plain_object() {
        let vocabulary: Vocabulary = [("мир", "world"), ("да", "yes")].into_iter().collect();
        let json = vocabulary.to_json_string().unwrap();
        assert_eq!(json, r#"{"да":"yes","мир":"world"}"#);
        let parsed: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vocabulary);
    }
}
