//! Home feed view: "for you" and "following" lists with infinite scroll.
//!
//! Switching between feed types serves the cached list without a request
//! or loading state and restores the scroll offset saved for that type.

use tokio::time::Instant;

use crate::Error;
use crate::model::{FeedType, PageEnvelope, Post};
use crate::pagination::{FetchTicket, KeyState, MergeOutcome, PageCache, Selection};
use crate::trigger::{InfiniteScrollTrigger, Rect, SentinelId};
use crate::view::{Effect, LoadIndicator, View};

/// Page cache keyed by feed type.
pub type FeedCache = PageCache<FeedType, Post>;

/// Events the feed view reacts to.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The page was shown (initial mount or navigation back).
    Opened,
    /// The user picked another feed type while scrolled to `scroll_offset`.
    TabChanged { to: FeedType, scroll_offset: u32 },
    SentinelAttached(SentinelId),
    SentinelDetached,
    /// Current viewport and sentinel geometry.
    Viewport { root: Rect, sentinel: Rect },
    /// Explicit "load more", bypassing the sentinel.
    LoadMore,
    PageLoaded { ticket: FetchTicket<FeedType>, envelope: PageEnvelope<Post> },
    PageFailed { ticket: FetchTicket<FeedType>, message: String },
}

/// Feed state machine owning the per-type page cache.
#[derive(Debug)]
pub struct FeedView {
    cache: FeedCache,
    active: FeedType,
    trigger: InfiniteScrollTrigger,
}

impl FeedView {
    pub fn new(trigger: InfiniteScrollTrigger) -> Self {
        Self { cache: PageCache::new(), active: FeedType::default(), trigger }
    }

    pub fn active(&self) -> FeedType {
        self.active
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn trigger(&self) -> &InfiniteScrollTrigger {
        &self.trigger
    }

    /// Posts of the active feed type in display order.
    pub fn posts(&self) -> &[Post] {
        self.cache
            .entry(&self.active)
            .map(|entry| entry.items.as_slice())
            .unwrap_or_default()
    }

    pub fn indicator(&self) -> LoadIndicator {
        match self.cache.state(&self.active) {
            KeyState::LoadingFirstPage => LoadIndicator::FirstPage,
            KeyState::LoadingNextPage => LoadIndicator::NextPage,
            KeyState::Empty | KeyState::Ready { .. } => LoadIndicator::Idle,
        }
    }

    /// True when the active feed finished loading with no posts at all.
    pub fn is_empty(&self) -> bool {
        matches!(self.cache.state(&self.active), KeyState::Ready { has_more: false }) && self.posts().is_empty()
    }

    fn scroll_key(feed: FeedType) -> String {
        feed.as_str().to_string()
    }

    fn show_active(&mut self) -> Result<Vec<Effect<FeedType>>, Error> {
        if let Selection::Hit(_) = self.cache.select(&self.active) {
            return Ok(vec![Effect::RestoreScroll { key: Self::scroll_key(self.active) }]);
        }

        let mut effects = vec![Effect::ScrollTo(0)];
        if let Some(ticket) = self.cache.begin_fetch(self.active, 1, false)? {
            effects.push(Effect::Fetch(ticket));
        }
        Ok(effects)
    }

    fn load_more(&mut self) -> Result<Vec<Effect<FeedType>>, Error> {
        if !matches!(self.cache.state(&self.active), KeyState::Ready { has_more: true }) {
            return Ok(Vec::new());
        }
        Ok(self
            .cache
            .begin_next_page(self.active)?
            .map(Effect::Fetch)
            .into_iter()
            .collect())
    }
}

impl Default for FeedView {
    fn default() -> Self {
        Self::new(InfiniteScrollTrigger::default())
    }
}

impl View for FeedView {
    type Key = FeedType;
    type Item = Post;
    type Event = FeedEvent;

    fn handle(&mut self, event: FeedEvent) -> Result<Vec<Effect<FeedType>>, Error> {
        match event {
            FeedEvent::Opened => self.show_active(),
            FeedEvent::TabChanged { to, scroll_offset } => {
                if to == self.active {
                    return Ok(Vec::new());
                }
                tracing::debug!(from = %self.active, %to, scroll_offset, "feed type changed");

                let mut effects = vec![Effect::SaveScroll { key: Self::scroll_key(self.active), offset: scroll_offset }];
                self.active = to;
                self.trigger.reset();
                effects.extend(self.show_active()?);
                Ok(effects)
            }
            FeedEvent::SentinelAttached(id) => {
                self.trigger.attach(id);
                Ok(Vec::new())
            }
            FeedEvent::SentinelDetached => {
                self.trigger.detach();
                Ok(Vec::new())
            }
            FeedEvent::Viewport { root, sentinel } => {
                self.trigger.observe(root, sentinel);
                if self.trigger.take_trigger() { self.load_more() } else { Ok(Vec::new()) }
            }
            FeedEvent::LoadMore => self.load_more(),
            FeedEvent::PageLoaded { ticket, envelope } => {
                if let MergeOutcome::Applied { .. } = self.cache.complete_fetch(ticket, envelope) {
                    self.trigger.rearm();
                }
                Ok(Vec::new())
            }
            FeedEvent::PageFailed { ticket, message } => {
                let current = self.cache.fail_fetch(&ticket);
                if !current || ticket.key != self.active {
                    tracing::debug!(key = %ticket.key, "dropping failure for inactive feed");
                    return Ok(Vec::new());
                }
                tracing::warn!(key = %ticket.key, page = ticket.page, %message, "feed page failed");
                Ok(vec![Effect::Notify(message)])
            }
        }
    }

    fn page_loaded(ticket: FetchTicket<FeedType>, envelope: PageEnvelope<Post>) -> FeedEvent {
        FeedEvent::PageLoaded { ticket, envelope }
    }

    fn page_failed(ticket: FetchTicket<FeedType>, message: String) -> FeedEvent {
        FeedEvent::PageFailed { ticket, message }
    }

    fn tick(_now: Instant) -> Option<FeedEvent> {
        None
    }
}
