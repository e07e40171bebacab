//! Committing a confirmed candidate into the raw text.
//!
//! The span replaced is the in-progress query (trigger char plus query text).
//! It is located by searching the current text again instead of trusting any
//! offset remembered from when the query was typed.

use std::ops::Range;

use crate::utils::{floor_char_boundary, next_whitespace_or_end, safe_replace_by_byte_indices, starts_with_ignore_case};


/// The result of inserting a mention's value into the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    /// Byte offset right after the inserted value and its separating whitespace.
    pub caret: usize,
    /// The span of the original text that was replaced.
    pub replaced: Range<usize>,
}

/// Replaces the query span in `raw_text` with `value`.
///
/// * `caret` is the caret at confirmation time.
/// * `query` is the query text without its trigger char.
///
/// The span is the case-insensitive occurrence of `trigger + query` that ends at
/// the caret's word end, or else the first occurrence in the text. If there is
/// none (e.g. a no-trigger query), the span is the `query.len()` bytes before the
/// caret's word end, moved forward by one if it starts on a space.
pub fn insert_mention(raw_text: &str, caret: usize, query: &str, trigger: char, value: &str) -> Insertion {
    let word_end = next_whitespace_or_end(raw_text, caret);
    let replaced = locate_query_span(raw_text, word_end, query, trigger)
        .unwrap_or_else(|| fallback_span(raw_text, word_end, query));

    let after = &raw_text[replaced.end..];
    let separator_len = match after.chars().next() {
        Some(c) if c.is_whitespace() => c.len_utf8(),
        _ => 0,
    };
    let replacement = if separator_len == 0 {
        format!("{value} ")
    } else {
        value.to_string()
    };
    let text = safe_replace_by_byte_indices(raw_text, replaced.start, replaced.end, &replacement);
    let caret = replaced.start + value.len() + separator_len.max(1);

    Insertion { text, caret, replaced }
}

fn locate_query_span(raw_text: &str, word_end: usize, query: &str, trigger: char) -> Option<Range<usize>> {
    let needle = format!("{trigger}{query}");
    let mut first = None;
    for (start, _) in raw_text.char_indices() {
        if !raw_text[start..].starts_with(trigger) {
            continue;
        }
        let Some(len) = starts_with_ignore_case(&raw_text[start..], &needle) else {
            continue;
        };
        let span = start..start + len;
        if span.end == word_end {
            return Some(span);
        }
        first.get_or_insert(span);
    }
    first
}

fn fallback_span(raw_text: &str, word_end: usize, query: &str) -> Range<usize> {
    let mut start = floor_char_boundary(raw_text, word_end.saturating_sub(query.len()));
    if raw_text[start..word_end].starts_with(' ') {
        start += 1;
    }
    start..word_end
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_trigger_query() {
        let ins = insert_mention("hi @bo", 6, "bo", '@', "Bob Jones");
        assert_eq!(ins.text, "hi Bob Jones ");
        assert_eq!(ins.caret, 13);
        assert_eq!(ins.replaced, 3..6);
    }

    #[test]
    fn test_insert_keeps_existing_space() {
        let ins = insert_mention("hi @bo there", 6, "bo", '@', "Bob");
        assert_eq!(ins.text, "hi Bob there");
        assert_eq!(ins.caret, 7);
    }

    #[test]
    fn test_caret_inside_query() {
        let ins = insert_mention("hi @bo", 4, "bo", '@', "Bob");
        assert_eq!(ins.text, "hi Bob ");
        assert_eq!(ins.caret, 7);
    }

    #[test]
    fn test_query_match_is_case_insensitive() {
        let ins = insert_mention("hey @BO", 7, "bo", '@', "Bob");
        assert_eq!(ins.text, "hey Bob ");
    }

    #[test]
    fn test_prefers_occurrence_at_caret() {
        // An earlier identical query that was left as plain text is not replaced.
        let ins = insert_mention("@bo said hi to @bo", 18, "bo", '@', "Bob");
        assert_eq!(ins.text, "@bo said hi to Bob ");
        assert_eq!(ins.caret, 19);
    }

    #[test]
    fn test_fallback_without_trigger() {
        let ins = insert_mention("say bobby", 9, "bobby", '@', "Bobby Tables");
        assert_eq!(ins.text, "say Bobby Tables ");
        assert_eq!(ins.caret, 17);
        assert_eq!(ins.replaced, 4..9);
    }

    #[test]
    fn test_fallback_skips_leading_space() {
        // The remembered query is longer than the word, so the span starts on a space.
        let ins = insert_mention("a bob", 5, "xbob", '@', "Bob");
        assert_eq!(ins.text, "a Bob ");
    }

    #[test]
    fn test_prefill_into_empty_text() {
        let ins = insert_mention("", 0, "", '@', "Bob");
        assert_eq!(ins.text, "Bob ");
        assert_eq!(ins.caret, 4);
    }

    #[test]
    fn test_bare_trigger_is_replaced() {
        let ins = insert_mention("hello @", 7, "", '@', "Bob");
        assert_eq!(ins.text, "hello Bob ");
    }
}
