//! Minimal string templates with `{placeholder}` substitution.
//!
//! Templates are the only markup knobs the engine exposes: list items, avatars,
//! the mention syntax token, and the highlight fragment. A template can also be
//! run in reverse ([`Template::match_at`]) so that the canonical syntax token can
//! be parsed back out of a serialized message.

use std::fmt;

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// A string template such as `<strong><span>{value}</span></strong>`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Template(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the template contains `{name}`.
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.pieces().iter().any(|p| *p == Piece::Placeholder(name))
    }

    /// Returns true if the template ends with literal text rather than a placeholder.
    pub fn ends_with_literal(&self) -> bool {
        matches!(self.pieces().last(), Some(Piece::Literal(_)))
    }

    /// Renders the template. Placeholders without a binding are emitted verbatim.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.0.len());
        for piece in self.pieces() {
            match piece {
                Piece::Literal(lit) => out.push_str(lit),
                Piece::Placeholder(name) => match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }

    /// Tries to match the template against `text` starting exactly at byte `start`.
    ///
    /// Placeholders listed in `fixed` must match their bound value literally.
    /// Every other placeholder captures lazily up to the next literal piece, and
    /// must capture at least one character. On success, returns the byte offset
    /// one past the match and the captured placeholder values in template order.
    pub fn match_at<'t>(
        &self,
        text: &'t str,
        start: usize,
        fixed: &[(&str, &str)],
    ) -> Option<(usize, Vec<(String, &'t str)>)> {
        let pieces = self.pieces();
        let mut pos = start;
        let mut captures = Vec::new();
        let mut iter = pieces.iter().peekable();

        while let Some(piece) = iter.next() {
            match piece {
                Piece::Literal(lit) => {
                    if !text.get(pos..)?.starts_with(lit) {
                        return None;
                    }
                    pos += lit.len();
                }
                Piece::Placeholder(name) => {
                    if let Some((_, value)) = fixed.iter().find(|(k, _)| k == name) {
                        if !text.get(pos..)?.starts_with(value) {
                            return None;
                        }
                        pos += value.len();
                        continue;
                    }
                    let delimiter = match iter.peek() {
                        Some(Piece::Literal(lit)) => *lit,
                        // Two adjacent placeholders or a trailing one cannot be delimited.
                        _ => return None,
                    };
                    let rest = text.get(pos..)?;
                    let len = rest.find(delimiter)?;
                    if len == 0 || rest[..len].contains('\n') {
                        return None;
                    }
                    captures.push((name.to_string(), &rest[..len]));
                    pos += len;
                }
            }
        }
        Some((pos, captures))
    }

    fn pieces(&self) -> Vec<Piece<'_>> {
        let src = self.0.as_str();
        let mut pieces = Vec::new();
        let mut literal_start = 0;
        let mut search_from = 0;

        while let Some(open_rel) = src[search_from..].find('{') {
            let open = search_from + open_rel;
            let Some(close_rel) = src[open + 1..].find('}') else {
                break;
            };
            let close = open + 1 + close_rel;
            let name = &src[open + 1..close];
            if is_placeholder_name(name) {
                if open > literal_start {
                    pieces.push(Piece::Literal(&src[literal_start..open]));
                }
                pieces.push(Piece::Placeholder(name));
                literal_start = close + 1;
                search_from = close + 1;
            } else {
                search_from = open + 1;
            }
        }
        if literal_start < src.len() {
            pieces.push(Piece::Literal(&src[literal_start..]));
        }
        pieces
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({:?})", self.0)
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::new(source)
    }
}


/// The set of templates used to render list items, the overlay, and mention markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    /// One dropdown entry. Placeholders: `uid`, `id`, `type`, `display`, `icon`, `content`.
    pub autocomplete_list_item: Template,
    /// Placeholder: `avatar`.
    pub autocomplete_list_item_avatar: Template,
    /// Placeholder: `icon`.
    pub autocomplete_list_item_icon: Template,
    /// Wraps the highlighted view. Placeholder: `content`.
    pub mentions_overlay: Template,
    /// The canonical token. Placeholders: `trigger`, `value`, `type`, `id`.
    pub mention_item_syntax: Template,
    /// Placeholder: `value` (already HTML-escaped).
    pub mention_item_highlight: Template,
    /// Wraps each term match inside a candidate name. Placeholder: `term`.
    pub term_highlight: Template,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            autocomplete_list_item: Template::new(
                r#"<li data-uid="{uid}" data-ref-id="{id}" data-ref-type="{type}" data-display="{display}">{icon}{content}</li>"#,
            ),
            autocomplete_list_item_avatar: Template::new(r#"<img src="{avatar}" />"#),
            autocomplete_list_item_icon: Template::new(r#"<div class="icon {icon}"></div>"#),
            mentions_overlay: Template::new(r#"<div class="mentions"><div>{content}</div></div>"#),
            mention_item_syntax: Template::new("{trigger}[{value}]({type}:{id})"),
            mention_item_highlight: Template::new("<strong><span>{value}</span></strong>"),
            term_highlight: Template::new("<b>{term}</b>"),
        }
    }
}
