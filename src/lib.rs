//! A mention-aware text input engine.
//!
//! Tracks inline mentions typed as a trigger char plus a query, dispatches
//! debounced lookups for the query at the caret, and derives a canonical
//! (serializable) and a highlighted (HTML) view of the raw text.

pub mod config;
pub mod error;
/// The engine itself, plus its building blocks.
pub mod mentionable_text_input;
pub mod templates;
/// The host widget adapter.
pub mod text_surface;

pub mod utils;


pub use config::MentionsConfig;
pub use error::MentionsError;
pub use mentionable_text_input::{
    MentionsInput,
    NavKey,
    candidates::LookupResult,
    mention_registry::Mention,
    render::RenderedViews,
    search_dispatcher::{Lookup, Responder, SearchRequest},
};
pub use text_surface::{BufferSurface, TextSurface};
