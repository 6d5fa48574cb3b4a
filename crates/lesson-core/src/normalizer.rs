//! Canonical dictionary keys for lesson words.
//!
//! A segment such as `"Привет!"` and a bare `"привет"` must resolve to the
//! same vocabulary entry and the same known-word flag, so every lookup goes
//! through [`normalize_word`] first.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters removed anywhere inside a token, not only at its edges.
pub const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '"', '(', ')'];

static RE_STRIPPED_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.,!?;:"()]"#).unwrap());

/// Canonicalize a raw token into a lookup key.
///
/// Removes the punctuation in [`STRIPPED_PUNCTUATION`], trims surrounding
/// whitespace and lowercases the rest. An empty result means the token is not
/// a word.
pub fn normalize_word(raw: &str) -> String {
    let stripped = RE_STRIPPED_PUNCTUATION.replace_all(raw.trim(), "");
    stripped.trim().to_lowercase()
}

/// True when the token normalizes to something usable as a key.
pub fn is_word(raw: &str) -> bool {
    !normalize_word(raw).is_empty()
}
