//! A text input engine with inline `@mention` support.
//!
//! [`MentionsInput`] sits on top of a [`TextSurface`] and keeps three things in
//! sync with the surface's raw text:
//!
//! * the registry of confirmed mentions, reconciled against the text on every edit,
//! * the canonical and highlighted views derived from the text,
//! * the in-progress mention query at the caret, which drives a debounced lookup
//!   and the candidate dropdown.
//!
//! The host forwards input events (`on_input`, `on_key`, `on_click`, ...) and
//! regularly calls [`MentionsInput::process_events`] on the same thread to
//! deliver timer expiries and lookup results.

pub mod candidates;
pub mod insertion;
pub mod mention_registry;
pub mod mention_utils;
pub mod render;
pub mod search_dispatcher;
pub mod trigger_query;

use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    config::MentionsConfig,
    text_surface::TextSurface,
    utils::grapheme_len,
};
use self::{
    candidates::{build_candidate_list, CandidateList, UidGenerator},
    insertion::insert_mention,
    mention_registry::{Mention, MentionRegistry},
    mention_utils::parse_canonical,
    render::{render_views, wrap_overlay, RenderedViews},
    search_dispatcher::{EngineEvent, Lookup, SearchDispatcher, SearchRequest},
    trigger_query::{classify_query, extract_query, strip_trigger, QueryAction, QueryState},
};


/// Keys the dropdown reacts to. Every other key is the host's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Return,
    Tab,
    Escape,
}

/// The mention engine for one text input.
pub struct MentionsInput<S: TextSurface> {
    config: MentionsConfig,
    surface: S,
    lookup: Option<Box<dyn Lookup>>,
    trigger_handler: Option<Box<dyn Lookup>>,
    registry: MentionRegistry,
    query: QueryState,
    candidates: Option<CandidateList>,
    views: RenderedViews,
    dispatcher: SearchDispatcher,
    uids: UidGenerator,
}

impl<S: TextSurface> MentionsInput<S> {
    pub fn new(config: MentionsConfig, surface: S) -> Self {
        let dispatcher = SearchDispatcher::new(config.search_delay());
        Self {
            config,
            surface,
            lookup: None,
            trigger_handler: None,
            registry: MentionRegistry::new(),
            query: QueryState::default(),
            candidates: None,
            views: RenderedViews::default(),
            dispatcher,
            uids: UidGenerator::default(),
        }
    }

    /// Sets the lookup that answers debounced searches.
    pub fn lookup(mut self, lookup: impl Lookup + 'static) -> Self {
        self.lookup = Some(Box::new(lookup));
        self
    }

    /// Sets the handler invoked immediately when a trigger-char query is too short to search.
    pub fn trigger_handler(mut self, handler: impl Lookup + 'static) -> Self {
        self.trigger_handler = Some(Box::new(handler));
        self
    }

    /// Clears the input and optionally starts it off with one mention.
    pub fn initialize(&mut self, prefill: Option<Mention>) {
        self.reset();
        if let Some(mention) = prefill {
            self.commit_mention(mention);
        }
    }

    /// Handles a change of the surface's text (and the caret move that came with it).
    pub fn on_input(&mut self) {
        let text = self.surface.text();
        self.registry.reconcile(&text);
        self.render(&text);

        if text.is_empty() {
            self.query = QueryState::default();
            self.close_dropdown();
            return;
        }

        let trigger = self.config.trigger_char;
        let found = extract_query(&text, self.surface.caret(), &self.config);
        let found_text = found.map(|m| m.text.to_string());
        match classify_query(found, &self.config, self.trigger_handler.is_some()) {
            QueryAction::Search { raw_query } => {
                self.query = QueryState::from_raw(&raw_query, trigger);
                self.dispatcher.schedule(raw_query);
            }
            QueryAction::TriggerChar { query } => {
                self.query = QueryState::from_raw(found_text.as_deref().unwrap_or_default(), trigger);
                self.dispatcher.cancel();
                let responder = self.dispatcher.responder(&query);
                if let Some(handler) = &self.trigger_handler {
                    handler.search(SearchRequest { query, triggered_by_char: true }, responder);
                }
            }
            QueryAction::Hide => {
                self.query = QueryState::default();
                self.close_dropdown();
            }
        }
    }

    /// Delivers every timer expiry and lookup result that has arrived so far.
    ///
    /// Returns the number of events handled. Lookups that answer synchronously
    /// are handled within the same call.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.dispatcher.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Like [`MentionsInput::process_events`], but first waits up to `timeout` for an event.
    pub fn wait_and_process_events(&mut self, timeout: Duration) -> usize {
        match self.dispatcher.recv_timeout(timeout) {
            Some(event) => {
                self.handle_event(event);
                1 + self.process_events()
            }
            None => 0,
        }
    }

    /// Handles a dropdown navigation key. Returns true if the key was consumed.
    pub fn on_key(&mut self, key: NavKey) -> bool {
        let Some(list) = self.candidates.as_mut() else {
            return false;
        };
        match key {
            NavKey::Up | NavKey::Down => {
                let changed = if key == NavKey::Up { list.select_previous() } else { list.select_next() };
                if changed {
                    self.surface.update_active(list);
                }
                true
            }
            NavKey::Return | NavKey::Tab => self.confirm_active(),
            NavKey::Escape => {
                self.close_dropdown();
                true
            }
        }
    }

    /// A click inside the input moves the caret; any pending search is dropped.
    pub fn on_click(&mut self) {
        self.dispatcher.cancel();
    }

    /// The caret moved without a text change.
    pub fn on_caret_moved(&mut self) {
        self.dispatcher.cancel();
    }

    pub fn on_blur(&mut self) {
        self.close_dropdown();
    }

    /// Confirms the active candidate. Returns false if there is none.
    pub fn confirm_active(&mut self) -> bool {
        let Some(mention) = self.candidates.as_ref().and_then(|l| l.active()).map(|c| c.mention.clone()) else {
            return false;
        };
        self.commit_mention(mention);
        true
    }

    /// Confirms the candidate rendered with this `data-uid`. Returns false if it isn't shown.
    pub fn confirm(&mut self, uid: &str) -> bool {
        let Some(mention) = self.candidates.as_ref().and_then(|l| l.find(uid)).map(|c| c.mention.clone()) else {
            debug!("Ignoring confirmation of unknown candidate {uid}");
            return false;
        };
        self.commit_mention(mention);
        true
    }

    /// The canonical form of the current text.
    pub fn canonical_value(&self) -> String {
        self.views.canonical.clone()
    }

    pub fn with_canonical_value<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.views.canonical)
    }

    /// The confirmed mentions, in the order they were confirmed.
    pub fn mentions(&self) -> Vec<Mention> {
        self.registry.to_vec()
    }

    pub fn with_mentions<R>(&self, f: impl FnOnce(&[Mention]) -> R) -> R {
        f(&self.registry.to_vec())
    }

    /// Empties the input and forgets every mention.
    pub fn reset(&mut self) {
        self.close_dropdown();
        self.registry.clear();
        self.query = QueryState::default();
        self.surface.set_text("");
        self.surface.set_caret(0);
        self.render("");
    }

    /// Loads a canonical message into the input.
    ///
    /// With `known` set, only tokens naming one of those mentions become mentions;
    /// the rest stay as literal text. The registry is replaced, not extended.
    pub fn render_from_canonical(&mut self, canonical: &str, known: Option<&[Mention]>) {
        let parsed = parse_canonical(canonical, &self.config, known);
        self.close_dropdown();
        self.query = QueryState::default();
        self.registry.clear();
        for mention in parsed.mentions {
            self.registry.insert(mention);
        }
        self.surface.set_text(&parsed.raw_text);
        self.surface.set_caret(parsed.raw_text.len());
        self.render(&parsed.raw_text);
    }

    pub fn views(&self) -> &RenderedViews {
        &self.views
    }

    pub fn query_state(&self) -> &QueryState {
        &self.query
    }

    pub fn candidates(&self) -> Option<&CandidateList> {
        self.candidates.as_ref()
    }

    pub fn registry(&self) -> &MentionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MentionsConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::SearchDue { generation } => {
                let Some(raw_query) = self.dispatcher.take_due(generation) else {
                    return;
                };
                self.dispatch_search(&raw_query);
            }
            EngineEvent::Results { generation, query, results } => {
                if !self.dispatcher.is_current(generation) {
                    debug!("Discarding stale lookup results for {query:?} (generation {generation})");
                    return;
                }
                match build_candidate_list(results, &self.registry, &query, &self.config, &mut self.uids) {
                    Some(list) => {
                        self.surface.show_dropdown(&list);
                        self.candidates = Some(list);
                    }
                    None => self.hide_dropdown(),
                }
            }
        }
    }

    fn dispatch_search(&mut self, raw_query: &str) {
        let (query, triggered_by_char) = strip_trigger(raw_query, self.config.trigger_char);
        if query.is_empty() || grapheme_len(query) < self.config.min_chars {
            self.hide_dropdown();
            return;
        }
        let Some(lookup) = &self.lookup else {
            warn!("No lookup is configured; ignoring search for {query:?}");
            return;
        };
        let responder = self.dispatcher.responder(query);
        lookup.search(SearchRequest { query: query.to_string(), triggered_by_char }, responder);
    }

    /// Replaces the in-progress query with `mention` and registers it.
    fn commit_mention(&mut self, mention: Mention) {
        let text = self.surface.text();
        let query = self.query.search_text(self.config.trigger_char).to_string();
        let insertion = insert_mention(&text, self.surface.caret(), &query, self.config.trigger_char, &mention.value);
        debug!("Inserted mention {}:{} over bytes {:?}", mention.kind, mention.id, insertion.replaced);

        self.registry.insert(mention);
        self.query = QueryState::default();
        self.close_dropdown();

        self.surface.set_text(&insertion.text);
        self.surface.set_caret(insertion.caret);
        self.surface.focus();
        self.registry.reconcile(&insertion.text);
        self.render(&insertion.text);
    }

    fn render(&mut self, text: &str) {
        self.views = render_views(text, self.registry.iter(), &self.config);
        let overlay = wrap_overlay(&self.views.highlighted, &self.config.templates);
        self.surface.set_views(&self.views, &overlay);
    }

    /// Cancels any pending search and hides the dropdown.
    fn close_dropdown(&mut self) {
        self.dispatcher.cancel();
        self.hide_dropdown();
    }

    fn hide_dropdown(&mut self) {
        if self.candidates.take().is_some() {
            debug!("Hiding the mention dropdown");
        }
        self.surface.hide_dropdown();
    }
}
