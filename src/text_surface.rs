//! The boundary between the mention engine and whatever widget hosts the text.
//!
//! The engine only reads text and caret from the surface and pushes rendered
//! output back into it. Everything platform specific (key codes, focus quirks,
//! pixel positions, resizing) stays on the host's side of this trait.

use crate::mentionable_text_input::{candidates::CandidateList, render::RenderedViews};


/// A host text input that the engine drives.
pub trait TextSurface {
    /// The current raw text.
    fn text(&self) -> String;

    /// The caret as a byte offset into [`TextSurface::text`].
    fn caret(&self) -> usize;

    fn set_text(&mut self, text: &str);

    fn set_caret(&mut self, caret: usize);

    /// Receives freshly rendered views after every text change.
    /// `overlay_html` is the highlighted view wrapped in the overlay template.
    fn set_views(&mut self, views: &RenderedViews, overlay_html: &str);

    /// Shows (or refreshes) the dropdown with these candidates.
    fn show_dropdown(&mut self, candidates: &CandidateList);

    fn hide_dropdown(&mut self);

    /// Called when the active candidate changed without the list itself changing.
    fn update_active(&mut self, candidates: &CandidateList) {
        self.show_dropdown(candidates);
    }

    /// Gives focus back to the input, e.g. after a candidate was clicked.
    fn focus(&mut self) {}
}


/// An in-memory [`TextSurface`], used by the CLI and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferSurface {
    text: String,
    caret: usize,
    views: RenderedViews,
    overlay_html: String,
    /// The item markup of every shown candidate, or `None` while hidden.
    dropdown: Option<Vec<String>>,
    active_uid: Option<String>,
    focused: bool,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the text and caret, as a user edit would.
    pub fn edit(&mut self, text: &str, caret: usize) {
        self.text = text.to_string();
        self.caret = caret.min(self.text.len());
    }

    /// Inserts `s` at the caret and moves the caret past it.
    pub fn type_str(&mut self, s: &str) {
        let caret = crate::utils::floor_char_boundary(&self.text, self.caret);
        self.text.insert_str(caret, s);
        self.caret = caret + s.len();
    }

    /// Deletes the grapheme before the caret.
    pub fn backspace(&mut self) {
        let caret = crate::utils::snap_to_grapheme_boundary(&self.text, self.caret);
        if caret == 0 {
            return;
        }
        let positions = crate::utils::build_grapheme_byte_positions(&self.text[..caret]);
        let start = positions.iter().rev().nth(1).copied().unwrap_or(0);
        self.text.replace_range(start..caret, "");
        self.caret = start;
    }

    pub fn views(&self) -> &RenderedViews {
        &self.views
    }

    pub fn overlay_html(&self) -> &str {
        &self.overlay_html
    }

    pub fn dropdown(&self) -> Option<&[String]> {
        self.dropdown.as_deref()
    }

    pub fn is_dropdown_visible(&self) -> bool {
        self.dropdown.is_some()
    }

    pub fn active_uid(&self) -> Option<&str> {
        self.active_uid.as_deref()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

impl TextSurface for BufferSurface {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn caret(&self) -> usize {
        self.caret
    }

    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.caret = self.caret.min(self.text.len());
    }

    fn set_caret(&mut self, caret: usize) {
        self.caret = caret.min(self.text.len());
    }

    fn set_views(&mut self, views: &RenderedViews, overlay_html: &str) {
        self.views = views.clone();
        self.overlay_html = overlay_html.to_string();
    }

    fn show_dropdown(&mut self, candidates: &CandidateList) {
        self.dropdown = Some(candidates.items().iter().map(|c| c.item_html.clone()).collect());
        self.active_uid = candidates.active().map(|c| c.uid.clone());
    }

    fn hide_dropdown(&mut self) {
        self.dropdown = None;
        self.active_uid = None;
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_and_backspace() {
        let mut surface = BufferSurface::new();
        surface.type_str("hi @jé");
        assert_eq!(surface.caret(), 7);
        surface.backspace();
        assert_eq!(surface.text(), "hi @j");
        assert_eq!(surface.caret(), 5);

        surface.set_caret(3);
        surface.type_str("x");
        assert_eq!(surface.text(), "hi x@j");
    }

    #[test]
    fn test_backspace_removes_whole_grapheme() {
        let mut surface = BufferSurface::new();
        surface.edit("ae\u{301}", 4);
        surface.backspace();
        assert_eq!(surface.text(), "a");
        surface.backspace();
        surface.backspace();
        assert_eq!(surface.text(), "");
        assert_eq!(surface.caret(), 0);
    }

    #[test]
    fn test_caret_is_clamped() {
        let mut surface = BufferSurface::new();
        surface.edit("abc", 10);
        assert_eq!(surface.caret(), 3);
        surface.set_text("a");
        assert_eq!(surface.caret(), 1);
    }
}
