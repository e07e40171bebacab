//! Configuration for the mention engine.
//!
//! The config can be built in code or deserialized from JSON; every field has a default,
//! so a partial JSON object like `{"trigger_char": "#"}` is valid.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::MentionsError,
    templates::Templates,
};


/// CSS classes applied by the host to dropdown entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classes {
    /// Class marking the keyboard-selected dropdown entry.
    pub autocomplete_item_active: String,
}

impl Default for Classes {
    fn default() -> Self {
        Self {
            autocomplete_item_active: "active".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionsConfig {
    /// The character that opens a mention query.
    pub trigger_char: char,
    /// Minimum query length (excluding the trigger) before a lookup is made.
    pub min_chars: usize,
    /// When set, any word at least this long triggers a lookup, no trigger char needed.
    pub min_chars_no_trigger: Option<usize>,
    /// Milliseconds of caret inactivity before a lookup is dispatched.
    pub search_delay_ms: u64,
    /// Whether dropdown entries render an avatar or icon.
    pub show_avatars: bool,
    /// Whether the host input should auto-expand with its content.
    pub elastic: bool,
    pub classes: Classes,
    pub templates: Templates,
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            trigger_char: '@',
            min_chars: 2,
            min_chars_no_trigger: None,
            search_delay_ms: 300,
            show_avatars: true,
            elastic: true,
            classes: Classes::default(),
            templates: Templates::default(),
        }
    }
}

impl MentionsConfig {
    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    /// The trigger character as an owned string.
    pub fn trigger_str(&self) -> String {
        self.trigger_char.to_string()
    }

    /// Parses and validates a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, MentionsError> {
        let config: MentionsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MentionsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MentionsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), MentionsError> {
        if self.trigger_char.is_whitespace() || self.trigger_char.is_control() {
            return Err(MentionsError::InvalidTrigger(self.trigger_char.to_string()));
        }
        if self.min_chars_no_trigger == Some(0) {
            return Err(MentionsError::InvalidMinLength {
                option: "min_chars_no_trigger",
                value: 0,
            });
        }

        let templates = &self.templates;
        let required: [(&'static str, &crate::templates::Template, &'static str); 5] = [
            ("mention_item_syntax", &templates.mention_item_syntax, "value"),
            ("mention_item_syntax", &templates.mention_item_syntax, "type"),
            ("mention_item_syntax", &templates.mention_item_syntax, "id"),
            ("mention_item_highlight", &templates.mention_item_highlight, "value"),
            ("term_highlight", &templates.term_highlight, "term"),
        ];
        for (template, source, placeholder) in required {
            if !source.has_placeholder(placeholder) {
                return Err(MentionsError::TemplateMissingPlaceholder { template, placeholder });
            }
        }
        // The syntax token has to be delimited on the right to be parsed back.
        if !templates.mention_item_syntax.ends_with_literal() {
            return Err(MentionsError::TemplateMissingPlaceholder {
                template: "mention_item_syntax",
                placeholder: "closing delimiter",
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MentionsConfig::default();
        assert_eq!(config.trigger_char, '@');
        assert_eq!(config.min_chars, 2);
        assert_eq!(config.min_chars_no_trigger, None);
        assert_eq!(config.search_delay(), Duration::from_millis(300));
        assert_eq!(config.classes.autocomplete_item_active, "active");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MentionsConfig::from_json(r##"{"trigger_char": "#", "search_delay_ms": 50}"##).unwrap();
        assert_eq!(config.trigger_char, '#');
        assert_eq!(config.search_delay_ms, 50);
        assert_eq!(config.min_chars, 2);
        assert!(config.show_avatars);
    }

    #[test]
    fn test_nested_template_override() {
        let json = r#"{"templates": {"mention_item_highlight": "<mark>{value}</mark>"}}"#;
        let config = MentionsConfig::from_json(json).unwrap();
        assert_eq!(config.templates.mention_item_highlight.as_str(), "<mark>{value}</mark>");
        assert_eq!(config.templates.term_highlight.as_str(), "<b>{term}</b>");
    }

    #[test]
    fn test_rejects_invalid_configs() {
        assert!(matches!(
            MentionsConfig::from_json(r#"{"trigger_char": " "}"#),
            Err(MentionsError::InvalidTrigger(_))
        ));
        assert!(matches!(
            MentionsConfig::from_json(r#"{"min_chars_no_trigger": 0}"#),
            Err(MentionsError::InvalidMinLength { .. })
        ));
        assert!(matches!(
            MentionsConfig::from_json(r#"{"templates": {"mention_item_syntax": "@{value}"}}"#),
            Err(MentionsError::TemplateMissingPlaceholder { .. })
        ));
        assert!(matches!(
            MentionsConfig::from_json("not json"),
            Err(MentionsError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MentionsConfig::load("/nonexistent/mentions.json").unwrap_err();
        assert!(matches!(err, MentionsError::ConfigIo { .. }));
    }
}
