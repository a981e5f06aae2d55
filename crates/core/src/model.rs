//! Feed and search data model.
//!
//! Mirrors the JSON the backend returns. Every paginated endpoint wraps its
//! items in the same `{ data, meta }` envelope.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// An account as it appears in feeds and people search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub is_followed: bool,
}

/// A reviewed place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Author summary attached to a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthor,
    #[serde(default)]
    pub is_owner: bool,
}

/// Attached photo or video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// A place review as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub total_likes: u64,
    #[serde(default)]
    pub total_comments: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub latest_comments: Vec<Comment>,
    #[serde(default)]
    pub media: Vec<Media>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_mine: bool,
    pub user: User,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Pagination metadata carried in `meta`.
///
/// Endpoints that do not paginate omit `meta`; the default then reads as a
/// single, final page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PageMeta {
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// The `{ data, meta }` response shape shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl<T> PageEnvelope<T> {
    pub fn new(data: Vec<T>, current_page: u32, last_page: u32) -> Self {
        Self { data, meta: PageMeta { current_page, last_page, per_page: None, total: None } }
    }

    /// Convert every item, keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageEnvelope<U> {
        PageEnvelope { data: self.data.into_iter().map(f).collect(), meta: self.meta }
    }
}

/// Feed variants selectable from the top bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeedType {
    #[default]
    #[serde(rename = "fyp")]
    ForYou,
    #[serde(rename = "following")]
    Following,
}

impl FeedType {
    /// Value sent as the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::ForYou => "fyp",
            FeedType::Following => "following",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the items a search tab returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Posts,
    Accounts,
    Places,
}

/// Search result categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTab {
    #[default]
    Top,
    Latest,
    Media,
    People,
    Places,
}

impl SearchTab {
    pub const ALL: [SearchTab; 5] =
        [SearchTab::Top, SearchTab::Latest, SearchTab::Media, SearchTab::People, SearchTab::Places];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTab::Top => "top",
            SearchTab::Latest => "latest",
            SearchTab::Media => "media",
            SearchTab::People => "people",
            SearchTab::Places => "places",
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self {
            SearchTab::Top | SearchTab::Latest | SearchTab::Media => ResultKind::Posts,
            SearchTab::People => ResultKind::Accounts,
            SearchTab::Places => ResultKind::Places,
        }
    }

    /// Resolve the `f` URL parameter, falling back to `Top` when absent or unknown.
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|p| p.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for SearchTab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchTab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown search tab: {s}")))
    }
}

impl fmt::Display for SearchTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search result. The variant follows from the tab the page was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Post(Post),
    Account(User),
    Place(Location),
}

impl SearchHit {
    pub fn kind(&self) -> ResultKind {
        match self {
            SearchHit::Post(_) => ResultKind::Posts,
            SearchHit::Account(_) => ResultKind::Accounts,
            SearchHit::Place(_) => ResultKind::Places,
        }
    }
}

/// Cache key for one search result list: normalized query plus tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    pub query: String,
    pub tab: SearchTab,
}

impl SearchKey {
    pub fn new(query: &str, tab: SearchTab) -> Self {
        Self { query: normalize_query(query), tab }
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tab, self.query)
    }
}

/// Normalize raw search input before it is used as a cache key.
pub fn normalize_query(text: &str) -> String {
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_JSON: &str = r#"{
        "data": [
            {
                "id": 7,
                "content": "Great coffee, slow wifi",
                "rating": 4,
                "total_likes": 12,
                "total_comments": 1,
                "is_liked": true,
                "latest_comments": [
                    {
                        "id": 3,
                        "content": "Agreed",
                        "created_at": "2025-03-01T08:30:00.000000Z",
                        "user": { "id": 2, "username": "rani", "profile_picture_url": null },
                        "is_owner": false
                    }
                ],
                "media": [{ "type": "image", "url": "https://cdn.example.com/a.jpg" }],
                "created_at": "2025-03-01T08:00:00.000000Z",
                "is_mine": false,
                "user": { "id": 1, "name": "Budi", "username": "budi", "profile_picture": null, "is_followed": true },
                "location": { "id": 9, "name": "Kopi Kenangan" }
            }
        ],
        "meta": { "current_page": 1, "last_page": 3, "per_page": 10, "total": 25 }
    }"#;

    #[test]
    fn test_deserialize_feed_envelope() {
        let envelope: PageEnvelope<Post> = serde_json::from_str(FEED_JSON).unwrap();
        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.meta.current_page, 1);
        assert_eq!(envelope.meta.last_page, 3);
        assert!(envelope.meta.has_more());

        let post = &envelope.data[0];
        assert_eq!(post.user.username, "budi");
        assert_eq!(post.media[0].kind, "image");
        assert_eq!(post.latest_comments[0].user.username, "rani");
        assert_eq!(post.location.as_ref().map(|l| l.name.as_str()), Some("Kopi Kenangan"));
    }

    #[test]
    fn test_missing_meta_is_final_page() {
        let envelope: PageEnvelope<Location> = serde_json::from_str(r#"{"data": [{"id": 1, "name": "Museum"}]}"#).unwrap();
        assert!(!envelope.meta.has_more());
    }

    #[test]
    fn test_has_more() {
        assert!(PageMeta { current_page: 2, last_page: 3, ..Default::default() }.has_more());
        assert!(!PageMeta { current_page: 3, last_page: 3, ..Default::default() }.has_more());
    }

    #[test]
    fn test_search_tab_from_param() {
        assert_eq!(SearchTab::from_param(Some("people")), SearchTab::People);
        assert_eq!(SearchTab::from_param(Some("bogus")), SearchTab::Top);
        assert_eq!(SearchTab::from_param(None), SearchTab::Top);
    }

    #[test]
    fn test_search_tab_kind() {
        assert_eq!(SearchTab::Media.kind(), ResultKind::Posts);
        assert_eq!(SearchTab::People.kind(), ResultKind::Accounts);
        assert_eq!(SearchTab::Places.kind(), ResultKind::Places);
    }

    #[test]
    fn test_feed_type_wire_values() {
        assert_eq!(FeedType::ForYou.as_str(), "fyp");
        assert_eq!(serde_json::to_string(&FeedType::Following).unwrap(), r#""following""#);
    }

    #[test]
    fn test_search_key_normalizes() {
        let key = SearchKey::new("  cafe  ", SearchTab::Latest);
        assert_eq!(key.query, "cafe");
        assert_eq!(key, SearchKey::new("cafe", SearchTab::Latest));
    }
}
