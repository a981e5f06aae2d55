//! Session-scoped key-value storage and scroll positions.
//!
//! Values live as long as the browsing session: `MemoryStorage` for the
//! lifetime of the process, `SessionDb` for a session id in a SQLite file.

pub mod connection;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;

pub use connection::SessionDb;

/// String-keyed, string-valued session storage.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    async fn remove_item(&self, key: &str) -> Result<(), Error>;

    async fn clear(&self) -> Result<(), Error>;
}

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        self.items.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.items.write().await.clear();
        Ok(())
    }
}

/// Last known vertical scroll offset per logical key.
#[derive(Debug)]
pub struct ScrollPositionStore<S> {
    storage: S,
}

impl<S: SessionStorage> ScrollPositionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn storage_key(key: &str) -> String {
        format!("scroll_position_{key}")
    }

    /// Record the offset for `key`, replacing any earlier value.
    pub async fn save(&self, key: &str, offset: u32) -> Result<(), Error> {
        self.storage
            .set_item(&Self::storage_key(key), &offset.to_string())
            .await
    }

    /// Offset last saved for `key`, or `None` if never saved.
    pub async fn load(&self, key: &str) -> Result<Option<u32>, Error> {
        let Some(raw) = self.storage.get_item(&Self::storage_key(key)).await? else {
            return Ok(None);
        };

        match raw.parse::<u32>() {
            Ok(offset) => Ok(Some(offset)),
            Err(e) => {
                tracing::warn!(key, value = %raw, error = %e, "ignoring unparseable scroll position");
                Ok(None)
            }
        }
    }
}
