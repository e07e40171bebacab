//! Debounced, cancellable dispatch of mention lookups.
//!
//! The engine never blocks on a lookup. A qualifying query starts a timer task
//! on the current tokio runtime; when the timer elapses it posts
//! [`EngineEvent::SearchDue`] back over a channel, and the host drains that
//! channel through the engine on its own thread. Lookups answer the same way,
//! through a one-shot [`Responder`].
//!
//! Every scheduled search gets a new generation number. Timers and responses
//! carrying an older generation are stale and get dropped when drained.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, warn};

use crate::mentionable_text_input::candidates::LookupResult;


/// Events delivered back to the engine from timers and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The debounce window for the search with this generation has elapsed.
    SearchDue { generation: u64 },
    /// A lookup answered the search with this generation.
    Results {
        generation: u64,
        query: String,
        results: Vec<LookupResult>,
    },
}

/// What is handed to a [`Lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// The query text, without the trigger char.
    pub query: String,
    /// Whether the query was introduced by the trigger char.
    pub triggered_by_char: bool,
}

/// An external source of mention candidates.
///
/// Implementations may answer synchronously from within `search`, or move the
/// responder to another task or thread and answer later. Not answering at all
/// is allowed and simply shows nothing.
pub trait Lookup {
    fn search(&self, request: SearchRequest, responder: Responder);
}

impl<F> Lookup for F
where
    F: Fn(SearchRequest, Responder),
{
    fn search(&self, request: SearchRequest, responder: Responder) {
        self(request, responder)
    }
}

/// The one-shot reply channel for a single lookup.
#[derive(Debug)]
pub struct Responder {
    sender: Sender<EngineEvent>,
    generation: u64,
    query: String,
}

impl Responder {
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Delivers the lookup results. Consumes the responder, so a lookup can answer only once.
    pub fn respond(self, results: Vec<LookupResult>) {
        let event = EngineEvent::Results {
            generation: self.generation,
            query: self.query,
            results,
        };
        if self.sender.send(event).is_err() {
            debug!("Dropping lookup results for generation {}: the input no longer exists", self.generation);
        }
    }
}


#[derive(Debug)]
struct PendingSearch {
    generation: u64,
    raw_query: String,
    timer: JoinHandle<()>,
}

/// Owns the debounce timer and the generation counter of one input.
#[derive(Debug)]
pub struct SearchDispatcher {
    delay: Duration,
    generation: u64,
    pending: Option<PendingSearch>,
    sender: Sender<EngineEvent>,
    receiver: Receiver<EngineEvent>,
}

impl SearchDispatcher {
    pub fn new(delay: Duration) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            delay,
            generation: 0,
            pending: None,
            sender,
            receiver,
        }
    }

    /// The generation of the most recent schedule or cancel.
    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    #[cfg(test)]
    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Restarts the debounce window for `raw_query`.
    ///
    /// Any pending timer is cancelled first, so at most one is ever pending.
    /// Returns false if there is no tokio runtime to run the timer on.
    pub fn schedule(&mut self, raw_query: String) -> bool {
        self.cancel();
        let Ok(runtime) = Handle::try_current() else {
            warn!("No tokio runtime is available; not scheduling a search for {raw_query:?}");
            return false;
        };
        let generation = self.generation;
        let delay = self.delay;
        let sender = self.sender.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(EngineEvent::SearchDue { generation });
        });
        self.pending = Some(PendingSearch { generation, raw_query, timer });
        true
    }

    /// Cancels the pending timer, if any, and invalidates every in-flight lookup.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
            debug!("Cancelled pending search for {:?}", pending.raw_query);
        }
        self.generation += 1;
    }

    /// Claims the query whose timer just fired.
    ///
    /// Returns `None` for a stale timer event.
    pub fn take_due(&mut self, generation: u64) -> Option<String> {
        match self.pending.take() {
            Some(pending) if pending.generation == generation => Some(pending.raw_query),
            other => {
                self.pending = other;
                debug!("Ignoring stale search timer for generation {generation}");
                None
            }
        }
    }

    /// A responder bound to the current generation.
    pub fn responder(&self, query: &str) -> Responder {
        Responder {
            sender: self.sender.clone(),
            generation: self.generation,
            query: query.to_string(),
        }
    }

    /// The next event that has already arrived, if any.
    pub fn try_next(&self) -> Option<EngineEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drains the events that have arrived so far without blocking.
    #[cfg(test)]
    fn try_iter(&self) -> crossbeam_channel::TryIter<'_, EngineEvent> {
        self.receiver.try_iter()
    }

    /// Blocks for up to `timeout` waiting for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl Drop for SearchDispatcher {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.timer.abort();
        }
    }
}
