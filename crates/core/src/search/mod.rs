//! Search view with tabbed result categories.
//!
//! Results are cached per (normalized query, tab). Switching tabs within
//! the same query serves cached pages and restores the tab's scroll offset.
//! A new query, once the debounced input settles, drops every cached tab
//! before anything is looked up again.

pub mod debounce;

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

pub use debounce::{DEFAULT_DEBOUNCE, QueryDebouncer};

use crate::Error;
use crate::model::{PageEnvelope, SearchHit, SearchKey, SearchTab, normalize_query};
use crate::pagination::{FetchTicket, KeyState, MergeOutcome, PageCache, PageEntry, Selection};
use crate::trigger::{InfiniteScrollTrigger, Rect, SentinelId};
use crate::view::{Effect, LoadIndicator, View};

/// Session key holding the last active search tab.
pub const LAST_TAB_KEY: &str = "search_last_tab";

/// Search result cache for the current query.
#[derive(Debug, Default)]
pub struct SearchCache {
    query: String,
    pages: PageCache<SearchKey, SearchHit>,
    offsets: HashMap<SearchTab, u32>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalized query all cached entries belong to.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Switch to a new query, dropping every entry if the normalized text changed.
    ///
    /// Returns true if the cache was invalidated.
    pub fn set_query(&mut self, text: &str) -> bool {
        let query = normalize_query(text);
        if query == self.query {
            return false;
        }
        tracing::debug!(from = %self.query, to = %query, "search query changed");
        self.invalidate_all();
        self.query = query;
        true
    }

    pub fn key(&self, tab: SearchTab) -> SearchKey {
        SearchKey { query: self.query.clone(), tab }
    }

    pub fn select(&self, tab: SearchTab) -> Selection<'_, SearchHit> {
        self.pages.select(&self.key(tab))
    }

    pub fn entry(&self, tab: SearchTab) -> Option<&PageEntry<SearchHit>> {
        self.pages.entry(&self.key(tab))
    }

    pub fn state(&self, tab: SearchTab) -> KeyState {
        self.pages.state(&self.key(tab))
    }

    /// Claim a first-page fetch for `tab`. Nothing is fetched for an empty query.
    pub fn begin_first_page(&mut self, tab: SearchTab) -> Result<Option<FetchTicket<SearchKey>>, Error> {
        if self.query.is_empty() {
            return Ok(None);
        }
        let key = self.key(tab);
        self.pages.begin_fetch(key, 1, false)
    }

    /// Claim the next-page fetch for `tab` (page 1 on a miss).
    pub fn begin_next_page(&mut self, tab: SearchTab) -> Result<Option<FetchTicket<SearchKey>>, Error> {
        if self.query.is_empty() {
            return Ok(None);
        }
        let key = self.key(tab);
        self.pages.begin_next_page(key)
    }

    pub fn complete_fetch(
        &mut self, ticket: FetchTicket<SearchKey>, envelope: PageEnvelope<SearchHit>,
    ) -> MergeOutcome {
        self.pages.complete_fetch(ticket, envelope)
    }

    pub fn fail_fetch(&mut self, ticket: &FetchTicket<SearchKey>) -> bool {
        self.pages.fail_fetch(ticket)
    }

    /// Remember the scroll offset of a tab being left. Ignored until the tab has results.
    pub fn save_offset(&mut self, tab: SearchTab, offset: u32) -> bool {
        if self.entry(tab).is_none() {
            return false;
        }
        self.offsets.insert(tab, offset);
        true
    }

    /// Offset to restore when revisiting `tab`; 0 when never saved.
    pub fn offset(&self, tab: SearchTab) -> u32 {
        self.offsets.get(&tab).copied().unwrap_or(0)
    }

    pub fn invalidate_all(&mut self) {
        self.pages.invalidate_all();
        self.offsets.clear();
    }
}

/// Events the search view reacts to.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Opened,
    /// Raw text typed into the search box.
    QueryInput { text: String, at: Instant },
    /// Wake-up requested through `Effect::WakeAt`.
    Tick { now: Instant },
    TabChanged { to: SearchTab, scroll_offset: u32 },
    SentinelAttached(SentinelId),
    SentinelDetached,
    Viewport { root: Rect, sentinel: Rect },
    LoadMore,
    PageLoaded { ticket: FetchTicket<SearchKey>, envelope: PageEnvelope<SearchHit> },
    PageFailed { ticket: FetchTicket<SearchKey>, message: String },
}

/// Search state machine.
#[derive(Debug)]
pub struct SearchView {
    cache: SearchCache,
    tab: SearchTab,
    input: String,
    debouncer: QueryDebouncer,
    trigger: InfiniteScrollTrigger,
}

impl SearchView {
    /// Create a view showing `query` on `tab`. The initial query is applied without debounce.
    pub fn new(trigger: InfiniteScrollTrigger, debounce: Duration, query: &str, tab: SearchTab) -> Self {
        let mut cache = SearchCache::new();
        cache.set_query(query);
        Self { cache, tab, input: query.to_string(), debouncer: QueryDebouncer::new(debounce), trigger }
    }

    pub fn tab(&self) -> SearchTab {
        self.tab
    }

    /// Text currently in the search box.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Query the displayed results belong to.
    pub fn query(&self) -> &str {
        self.cache.query()
    }

    pub fn cache(&self) -> &SearchCache {
        &self.cache
    }

    pub fn results(&self) -> &[SearchHit] {
        self.cache
            .entry(self.tab)
            .map(|entry| entry.items.as_slice())
            .unwrap_or_default()
    }

    pub fn indicator(&self) -> LoadIndicator {
        match self.cache.state(self.tab) {
            KeyState::LoadingFirstPage => LoadIndicator::FirstPage,
            KeyState::LoadingNextPage => LoadIndicator::NextPage,
            KeyState::Empty | KeyState::Ready { .. } => LoadIndicator::Idle,
        }
    }

    /// True when a non-empty query finished with zero results on the active tab.
    pub fn is_empty(&self) -> bool {
        !self.cache.query().is_empty()
            && matches!(self.cache.state(self.tab), KeyState::Ready { has_more: false })
            && self.results().is_empty()
    }

    fn show_active(&mut self) -> Result<Vec<Effect<SearchKey>>, Error> {
        if self.cache.query().is_empty() {
            return Ok(vec![Effect::ScrollTo(0)]);
        }
        if let Selection::Hit(_) = self.cache.select(self.tab) {
            return Ok(vec![Effect::ScrollTo(self.cache.offset(self.tab))]);
        }

        let mut effects = vec![Effect::ScrollTo(0)];
        if let Some(ticket) = self.cache.begin_first_page(self.tab)? {
            effects.push(Effect::Fetch(ticket));
        }
        Ok(effects)
    }

    fn load_more(&mut self) -> Result<Vec<Effect<SearchKey>>, Error> {
        if !matches!(self.cache.state(self.tab), KeyState::Ready { has_more: true }) {
            return Ok(Vec::new());
        }
        Ok(self
            .cache
            .begin_next_page(self.tab)?
            .map(Effect::Fetch)
            .into_iter()
            .collect())
    }

    fn settle_query(&mut self, now: Instant) -> Result<Vec<Effect<SearchKey>>, Error> {
        match self.debouncer.poll(now) {
            Some(text) => {
                if !self.cache.set_query(&text) {
                    return Ok(Vec::new());
                }
                self.trigger.reset();
                self.show_active()
            }
            None => Ok(self.debouncer.deadline().map(Effect::WakeAt).into_iter().collect()),
        }
    }
}

impl View for SearchView {
    type Key = SearchKey;
    type Item = SearchHit;
    type Event = SearchEvent;

    fn handle(&mut self, event: SearchEvent) -> Result<Vec<Effect<SearchKey>>, Error> {
        match event {
            SearchEvent::Opened => self.show_active(),
            SearchEvent::QueryInput { text, at } => {
                let deadline = self.debouncer.input(text.as_str(), at);
                self.input = text;
                Ok(vec![Effect::WakeAt(deadline)])
            }
            SearchEvent::Tick { now } => self.settle_query(now),
            SearchEvent::TabChanged { to, scroll_offset } => {
                if to == self.tab {
                    return Ok(Vec::new());
                }
                self.cache.save_offset(self.tab, scroll_offset);
                self.tab = to;
                self.trigger.reset();

                let mut effects = vec![Effect::SaveValue { key: LAST_TAB_KEY.to_string(), value: to.to_string() }];
                effects.extend(self.show_active()?);
                Ok(effects)
            }
            SearchEvent::SentinelAttached(id) => {
                self.trigger.attach(id);
                Ok(Vec::new())
            }
            SearchEvent::SentinelDetached => {
                self.trigger.detach();
                Ok(Vec::new())
            }
            SearchEvent::Viewport { root, sentinel } => {
                self.trigger.observe(root, sentinel);
                if self.trigger.take_trigger() { self.load_more() } else { Ok(Vec::new()) }
            }
            SearchEvent::LoadMore => self.load_more(),
            SearchEvent::PageLoaded { ticket, envelope } => {
                if let MergeOutcome::Applied { .. } = self.cache.complete_fetch(ticket, envelope) {
                    self.trigger.rearm();
                }
                Ok(Vec::new())
            }
            SearchEvent::PageFailed { ticket, message } => {
                let current = self.cache.fail_fetch(&ticket);
                if !current || ticket.key != self.cache.key(self.tab) {
                    return Ok(Vec::new());
                }
                tracing::warn!(key = %ticket.key, page = ticket.page, %message, "search page failed");
                Ok(vec![Effect::Notify(message)])
            }
        }
    }

    fn page_loaded(ticket: FetchTicket<SearchKey>, envelope: PageEnvelope<SearchHit>) -> SearchEvent {
        SearchEvent::PageLoaded { ticket, envelope }
    }

    fn page_failed(ticket: FetchTicket<SearchKey>, message: String) -> SearchEvent {
        SearchEvent::PageFailed { ticket, message }
    }

    fn tick(now: Instant) -> Option<SearchEvent> {
        Some(SearchEvent::Tick { now })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::post;
    use crate::model::{Location, User};

    fn view(query: &str) -> SearchView {
        SearchView::new(InfiniteScrollTrigger::default(), DEFAULT_DEBOUNCE, query, SearchTab::Top)
    }

    fn fetch_ticket(effects: &[Effect<SearchKey>]) -> FetchTicket<SearchKey> {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Fetch(ticket) => Some(ticket.clone()),
                _ => None,
            })
            .expect("fetch effect")
    }

    fn post_hits(ids: &[u64]) -> Vec<SearchHit> {
        ids.iter().map(|id| SearchHit::Post(post(*id))).collect()
    }

    fn post_ids(view: &SearchView) -> Vec<u64> {
        view.results()
            .iter()
            .filter_map(|hit| match hit {
                SearchHit::Post(p) => Some(p.id),
                _ => None,
            })
            .collect()
    }

    fn type_query(view: &mut SearchView, text: &str) -> Vec<Effect<SearchKey>> {
        let start = Instant::now();
        let effects = view
            .handle(SearchEvent::QueryInput { text: text.into(), at: start })
            .unwrap();
        assert_eq!(effects, vec![Effect::WakeAt(start + DEFAULT_DEBOUNCE)]);
        view.handle(SearchEvent::Tick { now: start + DEFAULT_DEBOUNCE }).unwrap()
    }

    #[test]
    fn test_set_query_invalidates_on_change_only() {
        let mut cache = SearchCache::new();
        assert!(cache.set_query("cafe"));
        let ticket = cache.begin_first_page(SearchTab::Top).unwrap().unwrap();
        cache.complete_fetch(ticket, PageEnvelope::new(post_hits(&[1]), 1, 1));

        assert!(!cache.set_query("  cafe "));
        assert!(cache.select(SearchTab::Top).is_hit());

        assert!(cache.set_query("museum"));
        assert!(!cache.select(SearchTab::Top).is_hit());
    }

    #[test]
    fn test_empty_query_never_fetches() {
        let mut view = view("   ");
        assert_eq!(view.handle(SearchEvent::Opened).unwrap(), vec![Effect::ScrollTo(0)]);
        assert!(view.handle(SearchEvent::LoadMore).unwrap().is_empty());
        assert!(!view.is_empty());
        assert!(view.results().is_empty());
    }

    #[test]
    fn test_tab_revisit_restores_offset_without_fetch() {
        let mut view = view("cafe");
        let ticket = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());
        assert_eq!(ticket.key, SearchKey::new("cafe", SearchTab::Top));
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(post_hits(&[1, 2]), 1, 2) })
            .unwrap();

        let effects = view
            .handle(SearchEvent::TabChanged { to: SearchTab::People, scroll_offset: 720 })
            .unwrap();
        assert_eq!(effects[0], Effect::SaveValue { key: LAST_TAB_KEY.into(), value: "people".into() });
        let ticket = fetch_ticket(&effects);
        assert_eq!(ticket.key.tab, SearchTab::People);

        let account = User { id: 4, name: "Sari".into(), username: "sari".into(), profile_picture: None, is_followed: false };
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(vec![SearchHit::Account(account)], 1, 1) })
            .unwrap();
        assert_eq!(view.results().len(), 1);

        let effects = view
            .handle(SearchEvent::TabChanged { to: SearchTab::Top, scroll_offset: 15 })
            .unwrap();
        assert_eq!(effects, vec![
            Effect::SaveValue { key: LAST_TAB_KEY.into(), value: "top".into() },
            Effect::ScrollTo(720),
        ]);
        assert_eq!(post_ids(&view), vec![1, 2]);
        assert_eq!(view.cache().offset(SearchTab::People), 15);
    }

    #[test]
    fn test_query_change_clears_all_tabs() {
        let mut view = view("cafe");
        let ticket = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(post_hits(&[1]), 1, 1) })
            .unwrap();

        let effects = type_query(&mut view, "museum");
        let ticket = fetch_ticket(&effects);
        assert_eq!(ticket.key, SearchKey::new("museum", SearchTab::Top));
        assert!(view.results().is_empty());
        assert_eq!(view.indicator(), LoadIndicator::FirstPage);
        assert!(!view.cache().select(SearchTab::Top).is_hit());
    }

    #[test]
    fn test_tick_before_deadline_reschedules() {
        let mut view = view("");
        let start = Instant::now();
        view.handle(SearchEvent::QueryInput { text: "kopi".into(), at: start })
            .unwrap();
        let effects = view
            .handle(SearchEvent::Tick { now: start + Duration::from_millis(100) })
            .unwrap();
        assert_eq!(effects, vec![Effect::WakeAt(start + DEFAULT_DEBOUNCE)]);
        assert_eq!(view.input(), "kopi");
        assert_eq!(view.query(), "");
    }

    #[test]
    fn test_same_normalized_query_keeps_cache() {
        let mut view = view("cafe");
        let ticket = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(post_hits(&[1]), 1, 1) })
            .unwrap();

        assert!(type_query(&mut view, "cafe ").is_empty());
        assert_eq!(post_ids(&view), vec![1]);
    }

    #[test]
    fn test_stale_response_after_query_round_trip() {
        let mut view = view("cafe");
        let stale = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());

        let museum = fetch_ticket(&type_query(&mut view, "museum"));
        let fresh = fetch_ticket(&type_query(&mut view, "cafe"));
        assert_eq!(stale.key, fresh.key);

        view.handle(SearchEvent::PageLoaded { ticket: stale, envelope: PageEnvelope::new(post_hits(&[1, 2]), 1, 3) })
            .unwrap();
        assert!(view.results().is_empty());
        assert_eq!(view.indicator(), LoadIndicator::FirstPage);

        view.handle(SearchEvent::PageLoaded { ticket: museum, envelope: PageEnvelope::new(post_hits(&[7]), 1, 1) })
            .unwrap();
        view.handle(SearchEvent::PageLoaded { ticket: fresh, envelope: PageEnvelope::new(post_hits(&[3]), 1, 1) })
            .unwrap();
        assert_eq!(post_ids(&view), vec![3]);
    }

    #[test]
    fn test_failure_on_active_tab_notifies() {
        let mut view = view("cafe");
        let ticket = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());
        let effects = view
            .handle(SearchEvent::PageFailed { ticket, message: "Gagal memuat".into() })
            .unwrap();
        assert_eq!(effects, vec![Effect::Notify("Gagal memuat".into())]);
        assert_eq!(view.cache().state(SearchTab::Top), KeyState::Empty);
    }

    #[test]
    fn test_places_next_page() {
        let mut view = SearchView::new(InfiniteScrollTrigger::default(), DEFAULT_DEBOUNCE, "pantai", SearchTab::Places);
        view.handle(SearchEvent::SentinelAttached(SentinelId(3))).unwrap();
        let ticket = fetch_ticket(&view.handle(SearchEvent::Opened).unwrap());
        let place = |id| SearchHit::Place(Location { id, name: format!("Pantai {id}"), address: None });
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(vec![place(1)], 1, 2) })
            .unwrap();

        let effects = view
            .handle(SearchEvent::Viewport {
                root: Rect::new(0.0, 0.0, 400.0, 800.0),
                sentinel: Rect::new(0.0, 300.0, 400.0, 40.0),
            })
            .unwrap();
        let ticket = fetch_ticket(&effects);
        assert_eq!((ticket.page, ticket.append), (2, true));
        view.handle(SearchEvent::PageLoaded { ticket, envelope: PageEnvelope::new(vec![place(2)], 2, 2) })
            .unwrap();
        assert_eq!(view.results().len(), 2);
        assert!(!view.is_empty());
    }
}
