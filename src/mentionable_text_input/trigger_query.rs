//! Detection of an in-progress mention query around the caret.
//!
//! The query always ends at the first whitespace at or after the caret, so a caret
//! in the middle of a word still sees the whole word. Two modes exist:
//!
//! * **Trigger mode** (`min_chars_no_trigger == None`): the query is the trigger char
//!   followed by one word, or by two words separated by a single whitespace,
//!   e.g. `@jo` or `@bob jo`.
//! * **No-trigger mode**: any trailing word is a query; `@bob jo` is still recognized
//!   as a two-word query when the previous word starts with the trigger.
//!
//! In both modes a bare trigger char at a word start yields a query of just the trigger,
//! so callers can react as soon as the trigger is typed.

use crate::{
    config::MentionsConfig,
    utils::{floor_char_boundary, grapheme_len, next_whitespace_or_end},
};


/// The substring of the raw text recognized as a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryMatch<'t> {
    pub text: &'t str,
    /// Byte offset of the first char of `text`.
    pub start: usize,
    /// Byte offset one past the last char of `text`.
    pub end: usize,
}

/// What the engine should do with the query found at the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAction {
    /// Schedule a debounced lookup for this raw query (trigger char not yet stripped).
    Search { raw_query: String },
    /// Call the trigger-char handler right away with this (stripped) query.
    TriggerChar { query: String },
    /// No usable query; hide the dropdown.
    Hide,
}

/// The per-input-cycle query state. Rebuilt on every text or caret event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub active: bool,
    /// The query as extracted from the text, including a leading trigger char if any.
    pub raw_query: String,
    /// Whether the query was introduced by the trigger char.
    pub triggered_by_char: bool,
}

impl QueryState {
    pub fn from_raw(raw_query: &str, trigger: char) -> Self {
        Self {
            active: true,
            raw_query: raw_query.to_string(),
            triggered_by_char: raw_query.starts_with(trigger),
        }
    }

    /// The query with its leading trigger char removed.
    pub fn search_text(&self, trigger: char) -> &str {
        strip_trigger(&self.raw_query, trigger).0
    }
}

/// Removes one leading trigger char. Returns the remainder and whether one was removed.
pub fn strip_trigger(query: &str, trigger: char) -> (&str, bool) {
    match query.strip_prefix(trigger) {
        Some(rest) => (rest, true),
        None => (query, false),
    }
}

/// Extracts the query that ends at the caret's word boundary, if any.
pub fn extract_query<'t>(text: &'t str, caret: usize, config: &MentionsConfig) -> Option<QueryMatch<'t>> {
    let caret = floor_char_boundary(text, caret);
    if caret == 0 {
        return None;
    }
    let end = next_whitespace_or_end(text, caret);
    let head = &text[..end];
    let trigger = config.trigger_char;
    let trigger_required = config.min_chars_no_trigger.is_none();

    if let Some(start) = leftmost_query_start(head, trigger, trigger_required) {
        return Some(QueryMatch { text: &head[start..], start, end });
    }

    // A bare trigger char at the start of a word.
    let before_trigger = head.strip_suffix(trigger)?;
    if before_trigger.is_empty() || before_trigger.ends_with(char::is_whitespace) {
        let start = before_trigger.len();
        return Some(QueryMatch { text: &head[start..], start, end });
    }
    None
}

/// Decides how the engine reacts to the extracted query.
pub fn classify_query(found: Option<QueryMatch<'_>>, config: &MentionsConfig, has_trigger_handler: bool) -> QueryAction {
    let Some(found) = found else {
        return QueryAction::Hide;
    };
    let trigger = config.trigger_char;
    let starts_with_trigger = found.text.starts_with(trigger);
    let len = grapheme_len(found.text);

    match config.min_chars_no_trigger {
        Some(min_no_trigger) if len >= min_no_trigger => {
            return QueryAction::Search { raw_query: found.text.to_string() };
        }
        None if starts_with_trigger && len >= config.min_chars + 1 => {
            return QueryAction::Search { raw_query: found.text.to_string() };
        }
        _ => {}
    }

    if starts_with_trigger && has_trigger_handler {
        let (query, _) = strip_trigger(found.text, trigger);
        return QueryAction::TriggerChar { query: query.to_string() };
    }
    QueryAction::Hide
}

/// Finds the leftmost start offset `p` such that `head[p..]` is a complete query.
fn leftmost_query_start(head: &str, trigger: char, trigger_required: bool) -> Option<usize> {
    // A query spans at most one whitespace char, so it can't start before the
    // second-to-last whitespace in `head`.
    let whitespace_ends = head.char_indices().filter(|(_, c)| c.is_whitespace()).map(|(i, c)| i + c.len_utf8());
    let mut last = None;
    let mut second_last = None;
    for after_ws in whitespace_ends {
        second_last = last;
        last = Some(after_ws);
    }
    let lower = second_last.unwrap_or(0);

    head[lower..]
        .char_indices()
        .map(|(i, _)| lower + i)
        .find(|&p| is_query_at(&head[p..], trigger, trigger_required))
}

fn is_query_at(candidate: &str, trigger: char, trigger_required: bool) -> bool {
    if let Some(rest) = candidate.strip_prefix(trigger) {
        if is_one_or_two_words(rest) {
            return true;
        }
    }
    // Without a required trigger, a single trailing word is enough.
    !trigger_required && is_single_word(candidate)
}

fn is_single_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// `word` or `word<one whitespace char>word`.
fn is_one_or_two_words(s: &str) -> bool {
    if is_single_word(s) {
        return true;
    }
    let Some((idx, ws)) = s.char_indices().find(|(_, c)| c.is_whitespace()) else {
        return false;
    };
    let (first, second) = (&s[..idx], &s[idx + ws.len_utf8()..]);
    is_single_word(first) && is_single_word(second)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_mode() -> MentionsConfig {
        MentionsConfig::default()
    }

    fn no_trigger_mode(min: usize) -> MentionsConfig {
        MentionsConfig { min_chars_no_trigger: Some(min), ..MentionsConfig::default() }
    }

    fn query(text: &str, caret: usize, config: &MentionsConfig) -> Option<String> {
        extract_query(text, caret, config).map(|m| m.text.to_string())
    }

    #[test]
    fn test_trigger_query_at_end() {
        let config = trigger_mode();
        let found = extract_query("hello @jo", 9, &config).unwrap();
        assert_eq!(found, QueryMatch { text: "@jo", start: 6, end: 9 });
    }

    #[test]
    fn test_two_word_trigger_query() {
        let config = trigger_mode();
        assert_eq!(query("hey @bob jo", 11, &config).as_deref(), Some("@bob jo"));
        // Three words after the trigger is too many.
        assert_eq!(query("hey @bob jo x", 13, &config), None);
    }

    #[test]
    fn test_caret_mid_word_extends_to_word_end() {
        let config = trigger_mode();
        assert_eq!(query("hi @johnny there", 5, &config).as_deref(), Some("@johnny"));
    }

    #[test]
    fn test_caret_at_zero_has_no_query() {
        assert_eq!(query("@jo", 0, &trigger_mode()), None);
        assert_eq!(query("word", 0, &no_trigger_mode(2)), None);
    }

    #[test]
    fn test_no_trigger_word_is_not_a_query_in_trigger_mode() {
        assert_eq!(query("hello jo", 8, &trigger_mode()), None);
    }

    #[test]
    fn test_bare_trigger() {
        let config = trigger_mode();
        assert_eq!(query("hi @", 4, &config).as_deref(), Some("@"));
        assert_eq!(query("@", 1, &config).as_deref(), Some("@"));
        assert_eq!(query("hi\n@", 4, &config).as_deref(), Some("@"));
    }

    #[test]
    fn test_trigger_inside_a_word_still_matches() {
        // The trigger doesn't have to start a word once characters follow it.
        assert_eq!(query("mail a@bc", 9, &trigger_mode()).as_deref(), Some("@bc"));
    }

    #[test]
    fn test_no_trigger_mode_returns_last_word() {
        let config = no_trigger_mode(4);
        assert_eq!(query("hello world", 11, &config).as_deref(), Some("world"));
        assert_eq!(query("ping @bob jo", 12, &config).as_deref(), Some("@bob jo"));
    }

    #[test]
    fn test_caret_inside_multibyte_char_is_clamped() {
        let config = trigger_mode();
        let text = "hi @jé";
        // Byte 6 is inside 'é'.
        assert_eq!(query(text, 6, &config).as_deref(), Some("@jé"));
    }

    #[test]
    fn test_classify_trigger_mode() {
        let config = trigger_mode();
        let found = extract_query("hello @jo", 9, &config);
        assert_eq!(
            classify_query(found, &config, false),
            QueryAction::Search { raw_query: "@jo".to_string() }
        );

        let short = extract_query("hello @j", 8, &config);
        assert_eq!(classify_query(short, &config, false), QueryAction::Hide);
        assert_eq!(
            classify_query(short, &config, true),
            QueryAction::TriggerChar { query: "j".to_string() }
        );

        let bare = extract_query("hello @", 7, &config);
        assert_eq!(
            classify_query(bare, &config, true),
            QueryAction::TriggerChar { query: String::new() }
        );
        assert_eq!(classify_query(None, &config, true), QueryAction::Hide);
    }

    #[test]
    fn test_classify_no_trigger_mode() {
        let config = no_trigger_mode(4);
        let long = extract_query("say hello", 9, &config);
        assert_eq!(
            classify_query(long, &config, false),
            QueryAction::Search { raw_query: "hello".to_string() }
        );
        let short = extract_query("say hel", 7, &config);
        assert_eq!(classify_query(short, &config, false), QueryAction::Hide);
    }

    #[test]
    fn test_query_state_strips_trigger() {
        let state = QueryState::from_raw("@jo", '@');
        assert!(state.active && state.triggered_by_char);
        assert_eq!(state.search_text('@'), "jo");

        let plain = QueryState::from_raw("hello", '@');
        assert!(!plain.triggered_by_char);
        assert_eq!(plain.search_text('@'), "hello");
    }
}
