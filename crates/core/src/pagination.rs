//! Pagination-and-cache engine shared by the feed and search views.
//!
//! Each key owns a slot holding the cached page entry and a loading flag.
//! Fetches are split into `begin_fetch` (guard + ticket) and
//! `complete_fetch` / `fail_fetch` (merge or release), so the network call
//! can happen anywhere in between.
//!
//! ### Invariants
//!
//! - At most one fetch per key is in flight; extra triggers are ignored, not queued.
//! - Appends are strictly sequential: page N+1 only after page N merged.
//! - Once `has_more` is false, appends stop until the key is reset.
//! - A slot gets a fresh generation whenever it is (re)created. Tickets whose
//!   generation no longer matches are stale and are discarded on arrival.
//! - A ticket settles its slot once. Delivering it again, or after its page
//!   was already released, is treated as stale.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::Error;
use crate::model::PageEnvelope;

/// Cached state for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry<T> {
    pub items: Vec<T>,
    /// Last successfully merged page number.
    pub page: u32,
    pub has_more: bool,
}

/// Per-key position in the load state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Empty,
    LoadingFirstPage,
    Ready { has_more: bool },
    LoadingNextPage,
}

/// Result of looking a key up.
#[derive(Debug)]
pub enum Selection<'a, T> {
    Hit(&'a PageEntry<T>),
    Miss,
}

impl<T> Selection<'_, T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Selection::Hit(_))
    }
}

/// Handle for one in-flight page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<K> {
    pub key: K,
    pub page: u32,
    pub append: bool,
    generation: u64,
    serial: u64,
}

impl<K> FetchTicket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What `complete_fetch` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied { received: usize, has_more: bool },
    Stale,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    entry: Option<PageEntry<T>>,
    /// Serial of the ticket currently in flight.
    pending: Option<u64>,
}

/// In-memory page cache keyed by filter.
#[derive(Debug)]
pub struct PageCache<K, T> {
    slots: HashMap<K, Slot<T>>,
    next_generation: u64,
    next_serial: u64,
}

impl<K, T> Default for PageCache<K, T> {
    fn default() -> Self {
        Self { slots: HashMap::new(), next_generation: 0, next_serial: 0 }
    }
}

impl<K, T> PageCache<K, T>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a cached entry, or report a miss the caller must fill with page 1.
    pub fn select(&self, key: &K) -> Selection<'_, T> {
        match self.slots.get(key).and_then(|slot| slot.entry.as_ref()) {
            Some(entry) => Selection::Hit(entry),
            None => Selection::Miss,
        }
    }

    pub fn entry(&self, key: &K) -> Option<&PageEntry<T>> {
        self.slots.get(key).and_then(|slot| slot.entry.as_ref())
    }

    pub fn state(&self, key: &K) -> KeyState {
        match self.slots.get(key) {
            None => KeyState::Empty,
            Some(Slot { pending: Some(_), entry: None, .. }) => KeyState::LoadingFirstPage,
            Some(Slot { pending: Some(_), entry: Some(_), .. }) => KeyState::LoadingNextPage,
            Some(Slot { pending: None, entry: Some(entry), .. }) => KeyState::Ready { has_more: entry.has_more },
            Some(Slot { pending: None, entry: None, .. }) => KeyState::Empty,
        }
    }

    pub fn is_loading(&self, key: &K) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.pending.is_some())
    }

    /// Claim the right to fetch `page` for `key`.
    ///
    /// Returns `Ok(None)` when the trigger must be ignored: a fetch for the key
    /// is already in flight, or the key has no more pages to append.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidPage` if `page` is 0, or an append is not the next page
    /// - `Error::MissingEntry` if `append` is set but nothing is cached yet
    pub fn begin_fetch(&mut self, key: K, page: u32, append: bool) -> Result<Option<FetchTicket<K>>, Error> {
        if page == 0 {
            return Err(Error::InvalidPage(format!("page must be at least 1 (key {key:?})")));
        }

        if self.is_loading(&key) {
            tracing::debug!(?key, page, "fetch already in flight, ignoring trigger");
            return Ok(None);
        }

        if append {
            let entry = self.entry(&key).ok_or_else(|| Error::MissingEntry(format!("{key:?}")))?;
            if !entry.has_more {
                tracing::debug!(?key, page, "last page reached, ignoring trigger");
                return Ok(None);
            }
            if page != entry.page + 1 {
                return Err(Error::InvalidPage(format!(
                    "expected page {} for {key:?}, got {page}",
                    entry.page + 1
                )));
            }
        }

        if !self.slots.contains_key(&key) {
            self.next_generation += 1;
            let slot = Slot { generation: self.next_generation, entry: None, pending: None };
            self.slots.insert(key.clone(), slot);
        }

        self.next_serial += 1;
        let serial = self.next_serial;
        let slot = self
            .slots
            .get_mut(&key)
            .ok_or_else(|| Error::MissingEntry(format!("{key:?}")))?;
        slot.pending = Some(serial);

        tracing::debug!(?key, page, append, generation = slot.generation, "fetch started");

        Ok(Some(FetchTicket { key, page, append, generation: slot.generation, serial }))
    }

    /// Claim the fetch a visible sentinel asks for: page 1 on a miss, otherwise the next page.
    pub fn begin_next_page(&mut self, key: K) -> Result<Option<FetchTicket<K>>, Error> {
        match self.entry(&key).map(|entry| entry.page + 1) {
            Some(next) => self.begin_fetch(key, next, true),
            None => self.begin_fetch(key, 1, false),
        }
    }

    fn current_slot(&mut self, ticket: &FetchTicket<K>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(&ticket.key)
            .filter(|slot| slot.generation == ticket.generation && slot.pending == Some(ticket.serial))
    }

    /// Merge a successful response into the entry the ticket was issued for.
    ///
    /// Responses for an invalidated key, or for a ticket that already settled,
    /// are discarded and reported as `Stale`.
    pub fn complete_fetch(&mut self, ticket: FetchTicket<K>, envelope: PageEnvelope<T>) -> MergeOutcome {
        let Some(slot) = self.current_slot(&ticket) else {
            tracing::debug!(key = ?ticket.key, page = ticket.page, "discarding stale response");
            return MergeOutcome::Stale;
        };

        slot.pending = None;
        let received = envelope.data.len();
        let has_more = envelope.meta.has_more();

        if ticket.append
            && let Some(entry) = slot.entry.as_mut()
        {
            entry.items.extend(envelope.data);
            entry.page = ticket.page;
            entry.has_more = has_more;
        } else {
            slot.entry = Some(PageEntry { items: envelope.data, page: ticket.page, has_more });
        }

        tracing::debug!(key = ?ticket.key, page = ticket.page, received, has_more, "page merged");

        MergeOutcome::Applied { received, has_more }
    }

    /// Release the loading flag after a failed fetch, leaving the entry as it was.
    ///
    /// Returns false if the ticket was stale or already settled.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket<K>) -> bool {
        match self.current_slot(ticket) {
            Some(slot) => {
                slot.pending = None;
                true
            }
            None => false,
        }
    }

    /// Drop one key. In-flight responses for it become stale.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every key. In-flight responses for any of them become stale.
    pub fn invalidate_all(&mut self) {
        if !self.slots.is_empty() {
            tracing::debug!(count = self.slots.len(), "invalidating page cache");
        }
        self.slots.clear();
    }

    /// Number of keys holding a cached entry.
    pub fn len(&self) -> usize {
        self.slots.values().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
