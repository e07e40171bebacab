//! Turning lookup results into dropdown candidates.
//!
//! Results that refer to an already-mentioned entity are dropped, the rest are
//! rendered through the list item templates with the query term highlighted,
//! and the first one becomes the active (keyboard-selected) entry.

use rangemap::RangeMap;
use serde::{Deserialize, Serialize};

use crate::{
    config::MentionsConfig,
    mentionable_text_input::mention_registry::{id_from_string_or_number, Mention, MentionRegistry},
    templates::Template,
    utils::starts_with_ignore_case,
};


/// One entry returned by the external lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Display name; becomes the mention's value once confirmed.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl LookupResult {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            name: name.into(),
            avatar: None,
            icon: None,
        }
    }
}

/// An unconfirmed search result shown in the dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Opaque local id mapping a rendered entry back to this candidate.
    pub uid: String,
    pub name: String,
    /// The mention this candidate becomes when confirmed.
    pub mention: Mention,
    /// The escaped name with query matches highlighted.
    pub content_html: String,
    /// The full list item markup.
    pub item_html: String,
}

/// Generates `mention_1`, `mention_2`, ... for the lifetime of one engine.
#[derive(Debug, Default)]
pub struct UidGenerator {
    next: u64,
}

impl UidGenerator {
    pub fn next_uid(&mut self) -> String {
        self.next += 1;
        format!("mention_{}", self.next)
    }
}

/// The open dropdown: formatted candidates plus the active entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    /// The query the candidates were produced for.
    pub query: String,
    items: Vec<Candidate>,
    active: Option<usize>,
    active_class: String,
}

impl CandidateList {
    pub fn items(&self) -> &[Candidate] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Candidate> {
        self.active.and_then(|i| self.items.get(i))
    }

    /// The CSS class the host applies to the active entry.
    pub fn active_class(&self) -> &str {
        &self.active_class
    }

    pub fn find(&self, uid: &str) -> Option<&Candidate> {
        self.items.iter().find(|c| c.uid == uid)
    }

    /// Moves the active entry down; with no active entry, activates the first one.
    /// Returns false if the selection didn't change.
    pub fn select_next(&mut self) -> bool {
        let next = match self.active {
            None => 0,
            Some(i) => i + 1,
        };
        if next < self.items.len() {
            self.active = Some(next);
            true
        } else {
            false
        }
    }

    /// Moves the active entry up. Returns false if the selection didn't change.
    pub fn select_previous(&mut self) -> bool {
        match self.active {
            Some(i) if i > 0 => {
                self.active = Some(i - 1);
                true
            }
            _ => false,
        }
    }
}

/// Filters out already-mentioned entities and formats the rest.
///
/// Returns `None` when nothing survives the filter: the dropdown must be hidden,
/// never shown empty.
pub fn build_candidate_list(
    results: Vec<LookupResult>,
    registry: &MentionRegistry,
    query: &str,
    config: &MentionsConfig,
    uids: &mut UidGenerator,
) -> Option<CandidateList> {
    let items: Vec<Candidate> = results
        .into_iter()
        .filter(|result| !registry.contains(&result.kind, &result.id))
        .map(|result| format_candidate(result, query, config, uids.next_uid()))
        .collect();

    if items.is_empty() {
        return None;
    }
    Some(CandidateList {
        query: query.to_string(),
        items,
        active: Some(0),
        active_class: config.classes.autocomplete_item_active.clone(),
    })
}

fn format_candidate(result: LookupResult, query: &str, config: &MentionsConfig, uid: String) -> Candidate {
    let templates = &config.templates;
    let escaped_name = htmlize::escape_all_quotes(result.name.as_str()).into_owned();
    let content_html = highlight_term(&escaped_name, query, &templates.term_highlight);

    let icon_html = if config.show_avatars {
        match &result.avatar {
            Some(avatar) => {
                let avatar = htmlize::escape_all_quotes(avatar.as_str());
                templates.autocomplete_list_item_avatar.render(&[("avatar", &*avatar)])
            }
            None => {
                let icon = htmlize::escape_all_quotes(result.icon.as_deref().unwrap_or_default());
                templates.autocomplete_list_item_icon.render(&[("icon", &*icon)])
            }
        }
    } else {
        String::new()
    };

    let item_html = {
        let escaped_id = htmlize::escape_all_quotes(result.id.as_str());
        let escaped_kind = htmlize::escape_all_quotes(result.kind.as_str());
        templates.autocomplete_list_item.render(&[
            ("uid", uid.as_str()),
            ("id", &*escaped_id),
            ("type", &*escaped_kind),
            ("display", escaped_name.as_str()),
            ("icon", icon_html.as_str()),
            ("content", content_html.as_str()),
        ])
    };

    let mention = Mention {
        value: result.name.clone(),
        kind: result.kind,
        id: result.id,
        avatar: result.avatar,
        icon: result.icon,
    };
    Candidate {
        uid,
        name: result.name,
        mention,
        content_html,
        item_html,
    }
}

/// Wraps every case-insensitive occurrence of `term` in already-escaped `html`.
///
/// Occurrences that start or end inside a markup tag (`<...>`) or a character
/// reference (`&...;`) are left alone, so escaping is never broken by the highlight.
pub fn highlight_term(html: &str, term: &str, template: &Template) -> String {
    if term.is_empty() {
        return html.to_string();
    }
    let escaped_term = htmlize::escape_all_quotes(term);
    let protected = protected_ranges(html);

    let mut out = String::with_capacity(html.len() + 16);
    let mut pos = 0;
    while pos < html.len() {
        let matched = starts_with_ignore_case(&html[pos..], &escaped_term).filter(|&len| len > 0);
        if let Some(len) = matched {
            let end = pos + len;
            if !splits_protected(&protected, pos, end) {
                out.push_str(&template.render(&[("term", &html[pos..end])]));
                pos = end;
                continue;
            }
        }
        let ch_len = html[pos..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&html[pos..pos + ch_len]);
        pos += ch_len;
    }
    out
}

/// True if `start..end` begins or ends strictly inside a protected range.
fn splits_protected(protected: &RangeMap<usize, usize>, start: usize, end: usize) -> bool {
    let starts_inside = protected.get_key_value(&start).is_some_and(|(range, _)| range.start != start);
    let ends_inside = protected.get_key_value(&(end - 1)).is_some_and(|(range, _)| range.end != end);
    starts_inside || ends_inside
}

/// Byte ranges of tags and character references in `html`, keyed by their start
/// so that adjacent ranges are never coalesced.
fn protected_ranges(html: &str) -> RangeMap<usize, usize> {
    let mut ranges = RangeMap::new();
    let bytes = html.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let closer = match bytes[i] {
            b'<' => b'>',
            b'&' => b';',
            _ => {
                i += 1;
                continue;
            }
        };
        let rest = &bytes[i + 1..];
        let stop = rest.iter().position(|&b| b == closer || (closer == b';' && (b == b'&' || b.is_ascii_whitespace())));
        match stop {
            Some(offset) if rest[offset] == closer => {
                let end = i + 1 + offset + 1;
                ranges.insert(i..end, i);
                i = end;
            }
            _ => i += 1,
        }
    }
    ranges
}
