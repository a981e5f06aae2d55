//! Network and effect-running side of the bage client.
//!
//! This crate provides:
//! - A REST client for the paginated feed and search endpoints
//! - The `PageSource` seam views fetch pages through
//! - A driver that runs view effects against a source and session storage

pub mod api;
pub mod driver;
pub mod source;

pub use api::{ApiClient, ApiConfig, ApiError};
pub use driver::{Driver, Outcome};
pub use source::PageSource;
