//! Derives the canonical and highlighted views from the raw text.
//!
//! Both views are pure functions of the raw text, the registered mentions
//! (in registration order) and the templates. Neither is ever fed back into
//! the raw text.

use std::ops::Range;

use rangemap::RangeMap;

use crate::{
    config::MentionsConfig,
    mentionable_text_input::mention_registry::Mention,
    templates::Templates,
};


/// The two derived views of the raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedViews {
    /// The serializable form, with every mention occurrence replaced by its syntax token.
    pub canonical: String,
    /// Escaped HTML for the overlay, with every mention occurrence highlighted.
    pub highlighted: String,
}

/// Renders both views of `raw_text`.
///
/// Mentions claim their occurrences in order; an occurrence overlapping text
/// already claimed by an earlier mention is left as plain text.
pub fn render_views<'m>(
    raw_text: &str,
    mentions: impl IntoIterator<Item = &'m Mention>,
    config: &MentionsConfig,
) -> RenderedViews {
    let mentions: Vec<&Mention> = mentions.into_iter().collect();
    let claimed = claim_occurrences(raw_text, &mentions);
    let templates = &config.templates;
    let trigger = config.trigger_str();

    let mut views = RenderedViews {
        canonical: String::with_capacity(raw_text.len()),
        highlighted: String::with_capacity(raw_text.len() * 2),
    };
    let mut pos = 0;
    for (range, &(_, index)) in claimed.iter() {
        let plain = &raw_text[pos..range.start];
        views.canonical.push_str(plain);
        views.highlighted.push_str(&escape_text(plain));

        let mention = mentions[index];
        views.canonical.push_str(&syntax_token(mention, &trigger, templates));
        views.highlighted.push_str(&templates.mention_item_highlight.render(&[
            ("value", escape_text(&mention.value).as_str()),
            ("type", mention.kind.as_str()),
            ("id", mention.id.as_str()),
        ]));
        pos = range.end;
    }
    let rest = &raw_text[pos..];
    views.canonical.push_str(rest);
    views.highlighted.push_str(&escape_text(rest));
    views
}

/// Wraps the highlighted view in the overlay template.
pub fn wrap_overlay(highlighted: &str, templates: &Templates) -> String {
    templates.mentions_overlay.render(&[("content", highlighted)])
}

/// The canonical token for one mention, e.g. `@[Bob](user:5)`.
pub fn syntax_token(mention: &Mention, trigger: &str, templates: &Templates) -> String {
    templates.mention_item_syntax.render(&[
        ("trigger", trigger),
        ("value", mention.value.as_str()),
        ("type", mention.kind.as_str()),
        ("id", mention.id.as_str()),
    ])
}

/// Maps each claimed byte range to `(range start, index into mentions)`.
///
/// The range start is part of the value so that two adjacent occurrences of
/// the same mention are never coalesced into one range.
fn claim_occurrences(raw_text: &str, mentions: &[&Mention]) -> RangeMap<usize, (usize, usize)> {
    let mut claimed = RangeMap::new();
    for (index, mention) in mentions.iter().enumerate() {
        if mention.value.is_empty() {
            continue;
        }
        for (start, matched) in raw_text.match_indices(mention.value.as_str()) {
            let range: Range<usize> = start..start + matched.len();
            if !claimed.overlaps(&range) {
                claimed.insert(range, (start, index));
            }
        }
    }
    claimed
}

/// Escapes plain text for the overlay and keeps line breaks and runs of spaces visible.
fn escape_text(text: &str) -> String {
    htmlize::escape_all_quotes(text)
        .replace('\n', "<br />")
        .replace("  ", "&nbsp; ")
}
