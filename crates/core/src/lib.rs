//! Core types and shared functionality for the bage client.
//!
//! This crate provides:
//! - Feed and search data model with the `{ data, meta }` page envelope
//! - Pagination-and-cache engine with stale-response detection
//! - Event-driven feed and search views
//! - Infinite-scroll trigger and session-scoped scroll positions
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod pagination;
pub mod search;
pub mod session;
pub mod trigger;
pub mod view;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use feed::{FeedCache, FeedEvent, FeedView};
pub use model::{
    Comment, CommentAuthor, FeedType, Location, Media, PageEnvelope, PageMeta, Post, ResultKind, SearchHit, SearchKey,
    SearchTab, User, normalize_query,
};
pub use pagination::{FetchTicket, KeyState, MergeOutcome, PageCache, PageEntry, Selection};
pub use search::{QueryDebouncer, SearchCache, SearchEvent, SearchView};
pub use session::{MemoryStorage, ScrollPositionStore, SessionDb, SessionStorage};
pub use trigger::{InfiniteScrollTrigger, Rect, RootMargin, SentinelId, TriggerOptions};
pub use view::{Effect, LoadIndicator, View};
