//! Page sources: where a view's `Fetch` effects are served from.

use async_trait::async_trait;
use bage_core::{FeedType, PageEnvelope, Post, SearchHit, SearchKey};

use crate::api::{ApiClient, ApiError};

/// Fetches one page for a cache key.
#[async_trait]
pub trait PageSource<K, T>: Send + Sync
where
    K: Send + Sync,
    T: Send,
{
    async fn fetch_page(&self, key: &K, page: u32) -> Result<PageEnvelope<T>, ApiError>;
}

#[async_trait]
impl PageSource<FeedType, Post> for ApiClient {
    async fn fetch_page(&self, key: &FeedType, page: u32) -> Result<PageEnvelope<Post>, ApiError> {
        self.feed(*key, page).await
    }
}

#[async_trait]
impl PageSource<SearchKey, SearchHit> for ApiClient {
    async fn fetch_page(&self, key: &SearchKey, page: u32) -> Result<PageEnvelope<SearchHit>, ApiError> {
        self.search(key, page).await
    }
}
