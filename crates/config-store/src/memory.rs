//! In-memory backend

use crate::{ConfigMap, ConfigStore, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// [`ConfigStore`] that keeps the mapping in memory
///
/// Clones share the same mapping, so a test can keep one handle and inspect
/// what the client saved through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    config: Arc<RwLock<ConfigMap>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `config`
    pub fn with_config(config: ConfigMap) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times [`ConfigStore::save`] has been called
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Snapshot of the current mapping
    pub async fn snapshot(&self) -> ConfigMap {
        self.config.read().await.clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<ConfigMap> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, config: &ConfigMap) -> Result<()> {
        *self.config.write().await = config.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
