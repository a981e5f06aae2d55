//! Runs view effects against a page source and session storage.
//!
//! A view only describes what should happen. The driver performs each
//! effect and reports what the presentation layer has to do: scroll, show a
//! notice, or wake later. Fetches run as spawned tasks, so further events
//! (tab switches, typing) can be dispatched while pages are in flight; each
//! finished fetch is applied by `next_outcome`.

use std::sync::Arc;

use bage_core::search::LAST_TAB_KEY;
use bage_core::{
    AppConfig, Effect, Error, FeedType, FeedView, FetchTicket, InfiniteScrollTrigger, PageEnvelope, Post,
    ScrollPositionStore, SearchHit, SearchKey, SearchTab, SearchView, SessionStorage, View,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::api::ApiError;
use crate::source::PageSource;

type Completion<K, T> = (FetchTicket<K>, Result<PageEnvelope<T>, ApiError>);

/// What the presentation layer should do after an event was handled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Final scroll target, if any effect asked for one.
    pub scroll_to: Option<u32>,
    /// One-shot notifications, oldest first.
    pub notices: Vec<String>,
    /// Call `Driver::wake` at this instant.
    pub wake_at: Option<Instant>,
    /// The backend rejected the session token; go back to login.
    pub signed_out: bool,
    /// Number of page requests started.
    pub fetches: usize,
}

impl Outcome {
    /// Fold a later outcome into this one.
    pub fn absorb(&mut self, later: Outcome) {
        self.scroll_to = later.scroll_to.or(self.scroll_to);
        self.notices.extend(later.notices);
        self.wake_at = later.wake_at.or(self.wake_at);
        self.signed_out |= later.signed_out;
        self.fetches += later.fetches;
    }
}

pub struct Driver<V: View, S, St> {
    view: V,
    source: Arc<S>,
    scroll: ScrollPositionStore<St>,
    completions_tx: mpsc::UnboundedSender<Completion<V::Key, V::Item>>,
    completions: mpsc::UnboundedReceiver<Completion<V::Key, V::Item>>,
    in_flight: usize,
}

impl<V, S, St> Driver<V, S, St>
where
    V: View,
    V::Key: 'static,
    V::Item: 'static,
    S: PageSource<V::Key, V::Item> + 'static,
    St: SessionStorage,
{
    pub fn new(view: V, source: Arc<S>, storage: St) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        Self { view, source, scroll: ScrollPositionStore::new(storage), completions_tx, completions, in_flight: 0 }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn scroll_store(&self) -> &ScrollPositionStore<St> {
        &self.scroll
    }

    /// Fetches started but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Handle `event` and run its effects. Returns once fetches are started,
    /// without waiting for them.
    ///
    /// Session storage failures are logged and skipped; only view errors are returned.
    pub async fn dispatch(&mut self, event: V::Event) -> Result<Outcome, Error> {
        let mut outcome = Outcome::default();
        for effect in self.view.handle(event)? {
            self.apply(effect, &mut outcome).await;
        }
        Ok(outcome)
    }

    async fn apply(&mut self, effect: Effect<V::Key>, outcome: &mut Outcome) {
        match effect {
            Effect::Fetch(ticket) => {
                outcome.fetches += 1;
                self.spawn_fetch(ticket);
            }
            Effect::ScrollTo(offset) => outcome.scroll_to = Some(offset),
            Effect::SaveScroll { key, offset } => {
                if let Err(e) = self.scroll.save(&key, offset).await {
                    tracing::warn!(key = %key, offset, error = %e, "failed to save scroll position");
                }
            }
            Effect::RestoreScroll { key } => {
                let offset = self.scroll.load(&key).await.unwrap_or_else(|e| {
                    tracing::warn!(key = %key, error = %e, "failed to load scroll position");
                    None
                });
                outcome.scroll_to = Some(offset.unwrap_or(0));
            }
            Effect::SaveValue { key, value } => {
                if let Err(e) = self.scroll.storage().set_item(&key, &value).await {
                    tracing::warn!(key = %key, error = %e, "failed to save session value");
                }
            }
            Effect::Notify(message) => outcome.notices.push(message),
            Effect::WakeAt(deadline) => outcome.wake_at = Some(deadline),
        }
    }

    fn spawn_fetch(&mut self, ticket: FetchTicket<V::Key>) {
        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = source.fetch_page(&ticket.key, ticket.page).await;
            // a closed channel means the driver is gone
            let _ = tx.send((ticket, result));
        });
    }

    /// Wait for the next finished fetch and apply it to the view.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Result<Option<Outcome>, Error> {
        if self.in_flight == 0 {
            return Ok(None);
        }
        let Some((ticket, result)) = self.completions.recv().await else {
            return Ok(None);
        };
        self.in_flight -= 1;

        let mut signed_out = false;
        let event = match result {
            Ok(envelope) => V::page_loaded(ticket, envelope),
            Err(err) => {
                tracing::debug!(key = ?ticket.key, page = ticket.page, error = %err, "page fetch failed");
                signed_out = matches!(err, ApiError::Unauthorized);
                V::page_failed(ticket, err.user_message())
            }
        };

        let mut outcome = self.dispatch(event).await?;
        outcome.signed_out |= signed_out;
        Ok(Some(outcome))
    }

    /// Apply fetches until none are in flight.
    pub async fn settle(&mut self) -> Result<Outcome, Error> {
        let mut total = Outcome::default();
        while let Some(outcome) = self.next_outcome().await? {
            total.absorb(outcome);
        }
        Ok(total)
    }

    /// Deliver a due wake-up to the view.
    pub async fn wake(&mut self, now: Instant) -> Result<Outcome, Error> {
        match V::tick(now) {
            Some(event) => self.dispatch(event).await,
            None => Ok(Outcome::default()),
        }
    }
}

fn trigger_from_config(config: &AppConfig) -> Result<InfiniteScrollTrigger, Error> {
    let options = config.trigger_options().map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(InfiniteScrollTrigger::new(options))
}

impl<S, St> Driver<FeedView, S, St>
where
    S: PageSource<FeedType, Post> + 'static,
    St: SessionStorage,
{
    pub fn feed(config: &AppConfig, source: Arc<S>, storage: St) -> Result<Self, Error> {
        Ok(Self::new(FeedView::new(trigger_from_config(config)?), source, storage))
    }
}

impl<S, St> Driver<SearchView, S, St>
where
    S: PageSource<SearchKey, SearchHit> + 'static,
    St: SessionStorage,
{
    /// Search screen for `query`.
    ///
    /// Without a `tab` parameter the tab last used in this session is restored.
    pub async fn search(
        config: &AppConfig, source: Arc<S>, storage: St, query: &str, tab: Option<&str>,
    ) -> Result<Self, Error> {
        let tab = match tab {
            Some(param) => SearchTab::from_param(Some(param)),
            None => match storage.get_item(LAST_TAB_KEY).await {
                Ok(Some(saved)) => saved.parse::<SearchTab>().unwrap_or_else(|e| {
                    tracing::warn!(value = %saved, error = %e, "ignoring unknown saved search tab");
                    SearchTab::Top
                }),
                Ok(None) => SearchTab::Top,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load last search tab");
                    SearchTab::Top
                }
            },
        };

        let view = SearchView::new(trigger_from_config(config)?, config.search_debounce(), query, tab);
        Ok(Self::new(view, source, storage))
    }
}
