//! JSON file backend
//!
//! Stores the mapping as a pretty-printed JSON object. Writes go through a
//! temp file and a rename by default, and older versions can be kept as
//! rotating backups.

use crate::{ConfigMap, ConfigStore, Result, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File-backed [`ConfigStore`]
///
/// A missing file loads as an empty mapping; the file is created on the
/// first save.
///
/// # Example
///
/// ```rust,no_run
/// use config_store::{ConfigStore, JsonFileStore};
///
/// # #[tokio::main]
/// # async fn main() -> config_store::Result<()> {
/// let store = JsonFileStore::new("bluesky.json").backups(true, 2);
/// let config = store.load().await?;
/// println!("logging in as {:?}", config.get("id"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    /// Path to the config file
    path: PathBuf,
    /// Write via temp file + rename
    atomic_writes: bool,
    /// Keep copies of previous versions
    auto_backup: bool,
    /// Number of backups to keep
    backup_count: usize,
}

impl JsonFileStore {
    /// Create a store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            atomic_writes: true,
            auto_backup: false,
            backup_count: 0,
        }
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }

    /// Configure backups
    pub fn backups(mut self, enabled: bool, count: usize) -> Self {
        self.auto_backup = enabled;
        self.backup_count = count;
        self
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write atomically using temp file + rename
    async fn write_atomic(&self, contents: &str) -> Result<()> {
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }

    /// Copy the current file into the backup rotation
    async fn create_backup(&self) -> Result<()> {
        if self.backup_count == 0 || !fs::try_exists(&self.path).await? {
            return Ok(());
        }

        for i in (1..self.backup_count).rev() {
            let from = self.backup_path(i);
            if fs::try_exists(&from).await? {
                fs::rename(&from, self.backup_path(i + 1)).await?;
            }
        }

        fs::copy(&self.path, self.backup_path(1)).await?;
        Ok(())
    }

    /// Path of the n-th backup (1 = most recent)
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut path = self.path.clone();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        path.set_file_name(format!("{}.backup.{}", filename, n));
        path
    }

    /// Restore the config file from a backup
    pub async fn restore_from_backup(&self, backup_number: usize) -> Result<ConfigMap> {
        let backup_path = self.backup_path(backup_number);
        fs::copy(&backup_path, &self.path).await?;
        self.load().await
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn load(&self) -> Result<ConfigMap> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Config file {} not found, starting empty", self.path.display());
                return Ok(ConfigMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(ConfigMap::new());
        }

        match serde_json::from_str(&contents)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(StoreError::NotAnObject(other.to_string())),
        }
    }

    async fn save(&self, config: &ConfigMap) -> Result<()> {
        if self.auto_backup {
            self.create_backup().await?;
        }

        let json = serde_json::to_string_pretty(config)?;

        if self.atomic_writes {
            self.write_atomic(&json).await?;
        } else {
            fs::write(&self.path, json).await?;
        }

        tracing::debug!("Saved config to {}", self.path.display());
        Ok(())
    }
}
