//! Credential and token persistence for minisky clients
//!
//! A client only needs two things from its configuration backend: load the
//! key/value mapping once, and save it back whenever tokens change. The
//! [`ConfigStore`] trait captures exactly that, so the file format is up to the
//! implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Ordered string-keyed mapping holding credentials, tokens and any extra fields
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document is valid JSON but not an object
    #[error("Config document is not a JSON object: {0}")]
    NotAnObject(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Backend that persists the credential mapping of a client
///
/// # Example
///
/// ```rust
/// use config_store::{ConfigMap, ConfigStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> config_store::Result<()> {
/// let store = MemoryStore::new();
///
/// let mut config = ConfigMap::new();
/// config.insert("id".into(), "alice.bsky.social".into());
/// store.save(&config).await?;
///
/// assert_eq!(store.load().await?["id"], "alice.bsky.social");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the whole mapping
    async fn load(&self) -> Result<ConfigMap>;

    /// Replace the persisted mapping with `config`
    async fn save(&self, config: &ConfigMap) -> Result<()>;
}

#[async_trait]
impl<T: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<T> {
    async fn load(&self) -> Result<ConfigMap> {
        (**self).load().await
    }

    async fn save(&self, config: &ConfigMap) -> Result<()> {
        (**self).save(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotAnObject("array".to_string());
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[tokio::test]
    async fn test_arc_store_delegates() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let mut config = ConfigMap::new();
        config.insert("pass".into(), "hunter2".into());
        store.save(&config).await.unwrap();

        assert_eq!(store.load().await.unwrap(), config);
        assert_eq!(store.save_count(), 1);
    }
}
