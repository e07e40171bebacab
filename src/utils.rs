//! Byte/grapheme index helpers shared by the mention engine.
//!
//! All caret offsets handled by this crate are byte offsets into a UTF-8 string.
//! Hosts may hand us offsets that fall inside a multi-byte character or inside
//! a grapheme cluster, so every function here clamps rather than panics.

use unicode_segmentation::UnicodeSegmentation;


/// Returns the largest char boundary in `text` that is `<= index`.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut idx = index;
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Snaps a byte offset to the start of the grapheme cluster containing it.
///
/// An offset equal to `text.len()` is returned unchanged.
pub fn snap_to_grapheme_boundary(text: &str, index: usize) -> usize {
    let index = floor_char_boundary(text, index);
    if index == text.len() {
        return index;
    }
    text.grapheme_indices(true)
        .map(|(i, _)| i)
        .take_while(|&i| i <= index)
        .last()
        .unwrap_or(0)
}

/// Builds the byte offset of every grapheme start, plus a trailing `text.len()` entry.
pub fn build_grapheme_byte_positions(text: &str) -> Vec<usize> {
    let mut positions: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
    positions.push(text.len());
    positions
}

/// The number of user-perceived characters in `text`.
pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Replaces `text[start..end]` with `replacement`, clamping both ends to valid char boundaries.
pub fn safe_replace_by_byte_indices(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let start = floor_char_boundary(text, start);
    let end = floor_char_boundary(text, end).max(start);
    let mut result = String::with_capacity(text.len() - (end - start) + replacement.len());
    result.push_str(&text[..start]);
    result.push_str(replacement);
    result.push_str(&text[end..]);
    result
}

/// Byte offset of the first whitespace character at or after `from`, or `text.len()`.
pub fn next_whitespace_or_end(text: &str, from: usize) -> usize {
    let from = floor_char_boundary(text, from);
    text[from..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map_or(text.len(), |(i, _)| from + i)
}

/// Case-insensitive test of whether `haystack` starts with `needle`.
///
/// Compares full Unicode lowercase mappings char by char and returns the byte length
/// of the matched prefix of `haystack`.
pub fn starts_with_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut hay_chars = haystack.char_indices();
    let mut needle_lower = needle.chars().flat_map(char::to_lowercase);
    let mut pending_hay: Vec<char> = Vec::new();
    let mut consumed = 0;

    loop {
        if pending_hay.is_empty() {
            let Some(n) = needle_lower.next() else {
                return Some(consumed);
            };
            let (i, h) = hay_chars.next()?;
            consumed = i + h.len_utf8();
            pending_hay.extend(h.to_lowercase());
            pending_hay.reverse();
            if pending_hay.pop() != Some(n) {
                return None;
            }
        } else {
            let n = needle_lower.next()?;
            if pending_hay.pop() != Some(n) {
                return None;
            }
        }
    }
}
