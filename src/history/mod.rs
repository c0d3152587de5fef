//! Append-only history of rating snapshots
//!
//! The pipeline's store step writes one entry per successfully fetched app.
//! Stores are optional: callers hold an `Option<Arc<dyn HistoryStore>>` and
//! check for presence before appending.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// One keyed message in the history log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    pub key: String,
}

/// Append-only keyed message log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;
}

/// History store errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode history entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// History store backed by a JSON-lines file
pub struct JsonlHistoryStore {
    path: PathBuf,
    // Serializes appends from this process so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every entry back, oldest first
    pub async fn read_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(HistoryError::from))
            .collect()
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(key = %entry.key, path = %self.path.display(), "Appended history entry");
        Ok(())
    }
}

/// History store held in memory, for tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(key: &str) -> HistoryEntry {
        HistoryEntry {
            role: "assistant".to_string(),
            content: "{\"appId\":\"com.example\"}".to_string(),
            key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_jsonl_store_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let store = JsonlHistoryStore::new(dir.path().join("nested/history.jsonl"));

        store.append(entry("rating_history:a:1")).await.unwrap();
        store.append(entry("rating_history:b:2")).await.unwrap();

        let entries = store.read_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "rating_history:a:1");
        assert_eq!(entries[1].key, "rating_history:b:2");
    }

    #[tokio::test]
    async fn test_jsonl_store_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlHistoryStore::new(dir.path().join("absent.jsonl"));

        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_store_records_entries() {
        let store = InMemoryHistoryStore::new();
        store.append(entry("k1")).await.unwrap();

        let entries = store.entries().await;
        assert_eq!(entries, vec![entry("k1")]);
    }
}
