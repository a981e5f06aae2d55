//! Backend REST API client.
//!
//! Provides a client for the paginated feed and search endpoints with bearer
//! token authentication, request validation, and envelope decoding.
//!
//! ### Behavior
//!
//! - **Authentication**: `Authorization: Bearer {token}` when a token is set.
//! - **401**: the stored token is cleared and `ApiError::Unauthorized` returned;
//!   the caller is expected to send the user back to login.
//! - **Other 4xx/5xx**: `ApiError::Http` with the status code.
//! - **Decoding**: `{ data, meta }` envelopes; search items by tab.

pub mod error;
pub mod request;
pub mod response;

pub use error::ApiError;
pub use request::{Endpoint, FeedRequest, SearchRequest};

use std::sync::Arc;
use std::time::{Duration, Instant};

use bage_core::{AppConfig, FeedType, PageEnvelope, Post, SearchHit, SearchKey};
use reqwest::{StatusCode, header};
use tokio::sync::RwLock;
use url::Url;

/// Default base URL for the backend API.
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "bage/0.1";

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL (default: http://localhost:8000/api).
    pub base_url: String,
    /// Bearer token, if the user is signed in.
    pub token: Option<String>,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&AppConfig> for ApiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            token: config.api_token.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Backend API client.
///
/// Cheap to clone; clones share the HTTP pool and the token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!("unsupported scheme: {}", base_url.scheme())));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ApiError::Network(Arc::new(e)))?;

        Ok(Self { http, base_url, token: Arc::new(RwLock::new(config.token)) })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(ApiConfig::from(config))
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Absolute URL for an endpoint, query parameters percent-encoded.
    pub fn build_url(&self, endpoint: &Endpoint) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(endpoint.path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        if !endpoint.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &endpoint.params {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }

    /// One page of the home feed.
    pub async fn feed(&self, feed: FeedType, page: u32) -> Result<PageEnvelope<Post>, ApiError> {
        let req = FeedRequest { feed, page };
        req.validate()?;

        let bytes = self.get(&req.endpoint()).await?;
        let envelope = response::decode_page::<Post>(&bytes)?;

        tracing::debug!(feed = %feed, page, items = envelope.data.len(), "feed page loaded");
        Ok(envelope)
    }

    /// One page of results for a search key.
    pub async fn search(&self, key: &SearchKey, page: u32) -> Result<PageEnvelope<SearchHit>, ApiError> {
        let req = SearchRequest::new(key, page);
        req.validate()?;

        let bytes = self.get(&req.endpoint()).await?;
        let envelope = response::decode_search(key.tab, &bytes)?;

        tracing::debug!(key = %key, page, items = envelope.data.len(), "search page loaded");
        Ok(envelope)
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Vec<u8>, ApiError> {
        let url = self.build_url(endpoint)?;
        let start = Instant::now();

        tracing::debug!("GET {}", url);

        let mut request = self.http.get(url).header(header::ACCEPT, "application/json");
        if let Some(token) = self.token.read().await.as_deref() {
            request = request.bearer_auth(token);
        }

        let http_response = request.send().await?;
        let status = http_response.status();
        tracing::debug!("API response status: {} in {:?}", status, start.elapsed());

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("session token rejected; clearing it");
            self.set_token(None).await;
            return Err(ApiError::Unauthorized);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::Http { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
