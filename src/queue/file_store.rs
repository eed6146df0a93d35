//! Directory-backed queue store that survives restarts.
//!
//! Layout: one `<id>.json` document per entry. Writes land in
//! `<id>.json.tmp` and are renamed into place, so a reader never sees a
//! partially written entry. Documents that fail to parse are renamed to
//! `<id>.json.corrupt` and no longer counted.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::entry::QueueEntry;
use super::store::{QueueStore, StoreError};

const ENTRY_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Queue store persisting each entry as a JSON file in one directory.
pub struct FileStore<O> {
    dir: PathBuf,
    _options: PhantomData<fn() -> O>,
}

impl<O> FileStore<O> {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::Unavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;
        log::debug!("Queue store opened at {}", dir.display());
        Ok(Self {
            dir,
            _options: PhantomData,
        })
    }

    /// Directory holding the entry documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        // Ids are generated by the queue, but never let one escape the directory.
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::Unavailable(format!("invalid entry id: {:?}", id)));
        }
        Ok(self.dir.join(format!("{}.{}", id, ENTRY_EXTENSION)))
    }

    /// Paths of all committed entry documents.
    async fn entry_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut paths = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    async fn quarantine(&self, path: &Path) {
        let mut target = path.as_os_str().to_owned();
        target.push(CORRUPT_SUFFIX);
        if let Err(e) = tokio::fs::rename(path, &target).await {
            log::warn!("Failed to quarantine {}: {}", path.display(), e);
        }
    }
}

impl<O: Serialize + DeserializeOwned> QueueStore<O> for FileStore<O> {
    async fn put(&self, entry: &QueueEntry<O>) -> Result<(), StoreError> {
        let path = self.entry_path(&entry.id)?;
        let mut temp = path.as_os_str().to_owned();
        temp.push(TEMP_SUFFIX);

        let json = serde_json::to_vec(entry)?;
        tokio::fs::write(&temp, &json).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<QueueEntry<O>>, StoreError> {
        let mut entries = Vec::new();
        for path in self.entry_paths().await? {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                // Deleted between listing and reading.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_slice::<QueueEntry<O>>(&bytes) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!("Quarantining unreadable queue entry {}: {}", path.display(), e);
                    self.quarantine(&path).await;
                }
            }
        }
        entries.sort_by(|a, b| (a.enqueued_at, &a.id).cmp(&(b.enqueued_at, &b.id)));
        Ok(entries)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.entry_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self) -> Result<usize, StoreError> {
        // Parse like get_all so unreadable documents are never counted as pending.
        Ok(self.get_all().await?.len())
    }
}

/// Default queue directory: `<local data dir>/elecmate/upload-queue`.
pub fn default_queue_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("elecmate").join("upload-queue"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::UploadFile;

    fn make_entry(name: &str, enqueued_at: u64) -> QueueEntry<Vec<String>> {
        let mut entry = QueueEntry::new(
            UploadFile::new(name, "image/png", vec![0x89, 0x50, 0x4E, 0x47]),
            vec!["tag-a".to_string()],
        );
        entry.enqueued_at = enqueued_at;
        entry
    }

    #[tokio::test]
    async fn test_file_store_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let entry = make_entry("a.png", 1);
        {
            let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
            store.put(&entry).await.unwrap();
        }

        let reopened: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.get_all().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_file_store_orders_by_enqueue_time() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        store.put(&make_entry("late.png", 30)).await.unwrap();
        store.put(&make_entry("early.png", 10)).await.unwrap();
        store.put(&make_entry("middle.png", 20)).await.unwrap();

        let names: Vec<String> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect();
        assert_eq!(names, vec!["early.png", "middle.png", "late.png"]);
    }

    #[tokio::test]
    async fn test_file_store_put_overwrites_and_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        let mut entry = make_entry("a.png", 1);
        store.put(&entry).await.unwrap();

        entry.retry_count = 4;
        store.put(&entry).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_all().await.unwrap()[0].retry_count, 4);

        store.delete(&entry.id).await.unwrap();
        store.delete(&entry.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_store_quarantines_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        store.put(&make_entry("good.png", 1)).await.unwrap();
        std::fs::write(dir.path().join("1-bad.json"), b"{ not json").unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(dir.path().join("1-bad.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_file_store_count_skips_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("1-bad.json"), b"{ not json").unwrap();

        // Counted before any drain has looked at the queue.
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get_all().await.unwrap().is_empty());
        assert!(dir.path().join("1-bad.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_file_store_ignores_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("1-abc.json.tmp"), b"partial").unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store: FileStore<Vec<String>> = FileStore::open(dir.path()).await.unwrap();
        let mut entry = make_entry("a.png", 1);
        entry.id = "../escape".to_string();
        assert!(matches!(store.put(&entry).await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_file_store_unavailable_when_directory_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("queue");
        let store: FileStore<Vec<String>> = FileStore::open(&root).await.unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        assert!(matches!(store.count().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.get_all().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.put(&make_entry("a.png", 1)).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
