//! Request parameters and endpoint mapping.
//!
//! ### Endpoints
//!
//! - Feed: `GET /feed?type={fyp|following}&page={n}`
//! - Posts: `GET /posts/search?search={q}&sort={top|latest}&page={n}` or `&type=media`
//! - People: `GET /users?search={q}&page={n}`
//! - Places: `GET /locations?search={q}&page={n}`

use bage_core::{FeedType, SearchKey, SearchTab, normalize_query};

use crate::api::ApiError;

/// Maximum accepted search query length in characters.
const MAX_QUERY_CHARS: usize = 256;

/// Path plus query parameters, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

fn validate_page(page: u32) -> Result<(), ApiError> {
    if page == 0 {
        return Err(ApiError::InvalidRequest("page must be at least 1".to_string()));
    }
    Ok(())
}

/// One page of the home feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRequest {
    pub feed: FeedType,
    pub page: u32,
}

impl FeedRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_page(self.page)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint { path: "feed", params: vec![("type", self.feed.as_str().to_string()), ("page", self.page.to_string())] }
    }
}

/// One page of results for a search tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub tab: SearchTab,
    pub page: u32,
}

impl SearchRequest {
    pub fn new(key: &SearchKey, page: u32) -> Self {
        Self { query: key.query.clone(), tab: key.tab, page }
    }

    /// Validate the search request parameters.
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_page(self.page)?;

        let query = normalize_query(&self.query);
        if query.is_empty() {
            return Err(ApiError::InvalidRequest("query cannot be empty".to_string()));
        }

        let chars = query.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(ApiError::InvalidRequest(format!(
                "query too long: {chars} chars (max {MAX_QUERY_CHARS})"
            )));
        }

        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        let search = ("search", normalize_query(&self.query));
        let page = ("page", self.page.to_string());

        match self.tab {
            SearchTab::Top => Endpoint { path: "posts/search", params: vec![search, ("sort", "top".into()), page] },
            SearchTab::Latest => {
                Endpoint { path: "posts/search", params: vec![search, ("sort", "latest".into()), page] }
            }
            SearchTab::Media => Endpoint { path: "posts/search", params: vec![search, ("type", "media".into()), page] },
            SearchTab::People => Endpoint { path: "users", params: vec![search, page] },
            SearchTab::Places => Endpoint { path: "locations", params: vec![search, page] },
        }
    }
}
