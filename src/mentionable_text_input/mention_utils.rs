//! Parsing canonical messages back into raw text plus mentions.
//!
//! A canonical message is what [`render_views`](super::render::render_views) produces:
//! plain text with each mention serialized through the `mention_item_syntax`
//! template, e.g. `hi @[Bob Jones](user:5)`.

use std::ops::Range;

use rangemap::RangeMap;
use tracing::debug;

use crate::{
    config::MentionsConfig,
    mentionable_text_input::{
        mention_registry::{Mention, MentionKey},
        render::syntax_token,
    },
    templates::Template,
};


/// A mention token found in a canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalToken<'t> {
    /// Byte range of the whole token in the message.
    pub range: Range<usize>,
    pub value: &'t str,
    pub kind: &'t str,
    pub id: &'t str,
}

impl CanonicalToken<'_> {
    pub fn key(&self) -> MentionKey {
        MentionKey::new(self.kind, self.id)
    }
}

/// A canonical message converted back into editable form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// The message with every accepted token replaced by its display value.
    pub raw_text: String,
    /// The accepted mentions, in order of first appearance, without duplicates.
    pub mentions: Vec<Mention>,
}

/// Finds every syntax token in `text`, scanning left to right.
///
/// Tokens never overlap: scanning resumes right after each token found.
pub fn find_canonical_tokens<'t>(text: &'t str, syntax: &Template, trigger: char) -> Vec<CanonicalToken<'t>> {
    let trigger = trigger.to_string();
    let fixed = [("trigger", trigger.as_str())];
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        if let Some((end, captures)) = syntax.match_at(text, pos, &fixed) {
            let capture = |name: &str| captures.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            if let (Some(value), Some(kind), Some(id)) = (capture("value"), capture("type"), capture("id")) {
                tokens.push(CanonicalToken { range: pos..end, value, kind, id });
                pos = end;
                continue;
            }
        }
        pos += text[pos..].chars().next().map_or(1, char::len_utf8);
    }
    tokens
}

/// Converts a canonical message into raw text and the mentions it contains.
///
/// With `known` set, only tokens naming one of those mentions are accepted.
/// Each known mention's exact token is matched first, so a value that contains
/// the template's delimiters still parses back intact. Any other token whose
/// `(type, id)` is known is accepted next, using the known mention's data.
/// Tokens that are not accepted stay in the raw text as literal text.
///
/// Without `known`, every token is accepted as written.
pub fn parse_canonical(text: &str, config: &MentionsConfig, known: Option<&[Mention]>) -> ParsedMessage {
    let tokens = match known {
        Some(known) => known_tokens(text, config, known),
        None => find_canonical_tokens(text, &config.templates.mention_item_syntax, config.trigger_char)
            .into_iter()
            .map(|token| (token.range, Mention::new(token.value, token.kind, token.id)))
            .collect(),
    };

    let mut parsed = ParsedMessage {
        raw_text: String::with_capacity(text.len()),
        mentions: Vec::new(),
    };
    let mut pos = 0;
    for (range, mention) in tokens {
        parsed.raw_text.push_str(&text[pos..range.start]);
        parsed.raw_text.push_str(&mention.value);
        pos = range.end;
        if !parsed.mentions.iter().any(|m| m.key() == mention.key()) {
            parsed.mentions.push(mention);
        }
    }
    parsed.raw_text.push_str(&text[pos..]);
    parsed
}

/// Locates the tokens of `known` mentions in `text`, ordered by position.
fn known_tokens(text: &str, config: &MentionsConfig, known: &[Mention]) -> Vec<(Range<usize>, Mention)> {
    let trigger = config.trigger_str();
    let mut claimed: RangeMap<usize, usize> = RangeMap::new();
    let mut found = Vec::new();

    for mention in known {
        let token = syntax_token(mention, &trigger, &config.templates);
        for (start, matched) in text.match_indices(token.as_str()) {
            let range = start..start + matched.len();
            if !claimed.overlaps(&range) {
                claimed.insert(range.clone(), start);
                found.push((range, mention.clone()));
            }
        }
    }

    for token in find_canonical_tokens(text, &config.templates.mention_item_syntax, config.trigger_char) {
        if claimed.overlaps(&token.range) {
            continue;
        }
        match known.iter().find(|m| m.key() == token.key()) {
            Some(mention) => {
                claimed.insert(token.range.clone(), token.range.start);
                found.push((token.range, mention.clone()));
            }
            None => debug!("Leaving mention token {:?} as text: {}:{} is not a known mention", token.value, token.kind, token.id),
        }
    }

    found.sort_by_key(|(range, _)| range.start);
    found
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mentionable_text_input::render::render_views;

    #[test]
    fn test_find_tokens() {
        let config = MentionsConfig::default();
        let text = "hi @[Bob Jones](user:5) and @[Ann](user:6)!";
        let tokens = find_canonical_tokens(text, &config.templates.mention_item_syntax, '@');
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "Bob Jones");
        assert_eq!(&text[tokens[0].range.clone()], "@[Bob Jones](user:5)");
        assert_eq!((tokens[1].kind, tokens[1].id), ("user", "6"));
    }

    #[test]
    fn test_malformed_tokens_are_text() {
        let config = MentionsConfig::default();
        let parsed = parse_canonical("mail me @ [x](y) or @[](user:1) or #[Bob](user:5)", &config, None);
        assert!(parsed.mentions.is_empty());
        assert_eq!(parsed.raw_text, "mail me @ [x](y) or @[](user:1) or #[Bob](user:5)");
    }

    #[test]
    fn test_parse_without_known_mentions() {
        let config = MentionsConfig::default();
        let parsed = parse_canonical("@[Ann](user:6) hi @[Ann](user:6)", &config, None);
        assert_eq!(parsed.raw_text, "Ann hi Ann");
        assert_eq!(parsed.mentions, vec![Mention::new("Ann", "user", "6")]);
    }

    #[test]
    fn test_unknown_tokens_stay_literal() {
        let config = MentionsConfig::default();
        let known = [Mention::new("Bob Jones", "user", "5")];
        let parsed = parse_canonical("@[Bob Jones](user:5) and @[Eve](user:9)", &config, Some(&known));
        assert_eq!(parsed.raw_text, "Bob Jones and @[Eve](user:9)");
        assert_eq!(parsed.mentions, known.to_vec());
    }

    #[test]
    fn test_canonical_round_trip() {
        let config = MentionsConfig::default();
        let raw = "hey Bob Jones, meet Ann\nbye";
        let mentions = [Mention::new("Bob Jones", "user", "5"), Mention::new("Ann", "contact", "6")];
        let original = render_views(raw, &mentions, &config);
        assert_eq!(original.canonical, "hey @[Bob Jones](user:5), meet @[Ann](contact:6)\nbye");

        let parsed = parse_canonical(&original.canonical, &config, None);
        assert_eq!(parsed.raw_text, raw);
        assert_eq!(parsed.mentions, mentions.to_vec());
        let restored = render_views(&parsed.raw_text, &parsed.mentions, &config);
        assert_eq!(restored.canonical, original.canonical);
        assert_eq!(restored.highlighted, original.highlighted);
    }

    #[test]
    fn test_known_value_containing_delimiters() {
        let config = MentionsConfig::default();
        let mentions = [Mention::new("Ann](x", "user", "6"), Mention::new("Bob Jones", "user", "5")];
        let raw = "Ann](x and Bob Jones";
        let original = render_views(raw, &mentions, &config);
        assert_eq!(original.canonical, "@[Ann](x](user:6) and @[Bob Jones](user:5)");

        let parsed = parse_canonical(&original.canonical, &config, Some(&mentions));
        assert_eq!(parsed.raw_text, raw);
        assert_eq!(parsed.mentions, mentions.to_vec());
        assert_eq!(render_views(&parsed.raw_text, &parsed.mentions, &config), original);
    }

    #[test]
    fn test_known_mention_matched_by_key() {
        let config = MentionsConfig::default();
        let known = [Mention::new("Bob Jones", "user", "5")];
        let parsed = parse_canonical("ping @[Bobby](user:5)", &config, Some(&known));
        assert_eq!(parsed.raw_text, "ping Bob Jones");
        assert_eq!(parsed.mentions, known.to_vec());
    }

    #[test]
    fn test_custom_syntax_and_trigger() {
        let mut config = MentionsConfig { trigger_char: '#', ..MentionsConfig::default() };
        config.templates.mention_item_syntax = Template::new("<{trigger}{type}:{id}|{value}>");
        let parsed = parse_canonical("tagged <#tag:9|rust>", &config, None);
        assert_eq!(parsed.raw_text, "tagged rust");
        assert_eq!(parsed.mentions, vec![Mention::new("rust", "tag", "9")]);
    }
}
