//! Effects emitted by the feed and search views.
//!
//! Views never perform I/O. They turn events into effects; a driver runs
//! the effects (network, session storage, scrolling) and feeds the results
//! back as events.

use std::fmt::Debug;
use std::hash::Hash;

use tokio::time::Instant;

use crate::Error;
use crate::model::PageEnvelope;
use crate::pagination::FetchTicket;

/// Side effect requested by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<K> {
    /// Request `ticket.page` for `ticket.key` and report back with the ticket.
    Fetch(FetchTicket<K>),
    /// Scroll the list to an absolute offset.
    ScrollTo(u32),
    /// Persist the outgoing scroll offset under a logical key.
    SaveScroll { key: String, offset: u32 },
    /// Load the saved offset for a logical key and scroll there (top if none).
    RestoreScroll { key: String },
    /// Persist a session value, e.g. the last active tab.
    SaveValue { key: String, value: String },
    /// Show a one-shot notification.
    Notify(String),
    /// Deliver a tick no earlier than this instant.
    WakeAt(Instant),
}

/// Which loading affordance to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadIndicator {
    Idle,
    /// Full-list spinner; nothing cached yet for the active key.
    FirstPage,
    /// Small inline spinner below already visible items.
    NextPage,
}

/// Event-driven list view with a paginated source.
pub trait View {
    type Key: Clone + Eq + Hash + Debug + Send + Sync;
    type Item: Send;
    type Event: Send;

    fn handle(&mut self, event: Self::Event) -> Result<Vec<Effect<Self::Key>>, Error>;

    /// Event reporting a successful fetch.
    fn page_loaded(ticket: FetchTicket<Self::Key>, envelope: PageEnvelope<Self::Item>) -> Self::Event;

    /// Event reporting a failed fetch.
    fn page_failed(ticket: FetchTicket<Self::Key>, message: String) -> Self::Event;

    /// Event delivered when a requested wake-up is due.
    fn tick(now: Instant) -> Option<Self::Event>;
}
