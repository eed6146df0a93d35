//! Queue store abstraction and the in-memory implementation.
//!
//! The store is a keyed collection of `QueueEntry` records. Every mutation
//! touches exactly one entry (`put`/`delete` by id), so callers never need
//! multi-entry transactions.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::entry::QueueEntry;

/// The single failure kind of a queue store.
///
/// Quota exhaustion, a missing or read-only directory and unreadable
/// documents all collapse into `Unavailable`: callers can only degrade.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Queue storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Durable keyed storage for pending uploads.
///
/// `get_all` returns a snapshot; entries added while a caller iterates it
/// are picked up on the next read. `count` is for display only.
#[allow(async_fn_in_trait)]
pub trait QueueStore<O> {
    /// Insert or overwrite an entry by id.
    async fn put(&self, entry: &QueueEntry<O>) -> Result<(), StoreError>;

    /// Every stored entry, in best-effort insertion order.
    async fn get_all(&self) -> Result<Vec<QueueEntry<O>>, StoreError>;

    /// Remove an entry by id. Removing an absent id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Process-local queue store.
///
/// Clones share the same entries, so a test can drop a controller and build
/// a new one over the same store to simulate a restart.
pub struct MemoryStore<O> {
    entries: Arc<Mutex<Vec<QueueEntry<O>>>>,
}

impl<O> MemoryStore<O> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<QueueEntry<O>>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl<O> Default for MemoryStore<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for MemoryStore<O> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<O: Clone> QueueStore<O> for MemoryStore<O> {
    async fn put(&self, entry: &QueueEntry<O>) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<QueueEntry<O>>, StoreError> {
        Ok(self.lock()?.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.lock()?.retain(|e| e.id != id);
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::UploadFile;

    fn make_entry(name: &str) -> QueueEntry<String> {
        QueueEntry::new(
            UploadFile::new(name, "image/jpeg", vec![0xFF, 0xD8]),
            format!("options for {}", name),
        )
    }

    #[tokio::test]
    async fn test_memory_store_put_is_idempotent_by_id() {
        let store: MemoryStore<String> = MemoryStore::new();
        let mut entry = make_entry("a.jpg");

        store.put(&entry).await.unwrap();
        store.put(&entry).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        entry.retry_count = 3;
        store.put(&entry).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].retry_count, 3);
    }

    #[tokio::test]
    async fn test_memory_store_keeps_insertion_order() {
        let store: MemoryStore<String> = MemoryStore::new();
        for name in ["first.jpg", "second.jpg", "third.jpg"] {
            store.put(&make_entry(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect();
        assert_eq!(names, vec!["first.jpg", "second.jpg", "third.jpg"]);
    }

    #[tokio::test]
    async fn test_memory_store_delete_absent_is_noop() {
        let store: MemoryStore<String> = MemoryStore::new();
        let entry = make_entry("a.jpg");
        store.put(&entry).await.unwrap();

        store.delete("missing").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&entry.id).await.unwrap();
        store.delete(&entry.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_entries() {
        let store: MemoryStore<String> = MemoryStore::new();
        let other = store.clone();
        store.put(&make_entry("a.jpg")).await.unwrap();
        assert_eq!(other.count().await.unwrap(), 1);
    }
}
