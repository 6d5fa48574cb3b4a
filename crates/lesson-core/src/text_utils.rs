//! Text splitting helpers for the vocabulary overlay.

/// Characters that separate word runs in lesson text.
pub const SEPARATORS: &[char] = &[' ', '\n', '\t'];

/// Split text into alternating word runs and separator runs.
///
/// Separator runs are kept as their own segments so that concatenating the
/// result reproduces `text` exactly, line breaks included. Empty input yields
/// no segments and no segment is ever empty.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_separator = false;

    for ch in text.chars() {
        let is_separator = SEPARATORS.contains(&ch);
        if is_separator != in_separator && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
        in_separator = is_separator;
        current.push(ch);
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// True when the segment is a run of separators.
pub fn is_separator(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|ch| SEPARATORS.contains(&ch))
}
