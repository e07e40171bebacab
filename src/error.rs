//! Error types for the fallible surfaces of the crate.
//!
//! The mention engine itself never fails: its operations degrade to no-ops.
//! Only configuration loading and validation report errors to the caller.

use std::path::PathBuf;

use thiserror::Error;


#[derive(Debug, Error)]
pub enum MentionsError {
    #[error("failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mentions config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The trigger must be exactly one non-whitespace character.
    #[error("invalid trigger character {0:?}: expected a single non-whitespace character")]
    InvalidTrigger(String),

    #[error("invalid minimum length for {option}: {value}")]
    InvalidMinLength { option: &'static str, value: usize },

    #[error("template `{template}` is missing the `{{{placeholder}}}` placeholder")]
    TemplateMissingPlaceholder {
        template: &'static str,
        placeholder: &'static str,
    },
}
