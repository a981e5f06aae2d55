//! Response envelope decoding.
//!
//! Search endpoints return different item shapes per tab; the tab a page was
//! requested for decides how its items are decoded.

use bage_core::{Location, PageEnvelope, Post, ResultKind, SearchHit, SearchTab, User};
use serde::de::DeserializeOwned;

use crate::api::ApiError;

/// Decode a `{ data, meta }` body.
pub fn decode_page<T: DeserializeOwned>(bytes: &[u8]) -> Result<PageEnvelope<T>, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Decode a search page into hits of the shape `tab` returns.
pub fn decode_search(tab: SearchTab, bytes: &[u8]) -> Result<PageEnvelope<SearchHit>, ApiError> {
    let envelope = match tab.kind() {
        ResultKind::Posts => decode_page::<Post>(bytes)?.map(SearchHit::Post),
        ResultKind::Accounts => decode_page::<User>(bytes)?.map(SearchHit::Account),
        ResultKind::Places => decode_page::<Location>(bytes)?.map(SearchHit::Place),
    };
    Ok(envelope)
}
