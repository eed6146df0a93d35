//! Upload queue controller.
//!
//! Accepts files while offline, persists them through a `QueueStore`, and
//! replays them against an `UploadOperation` when connectivity returns.
//!
//! At most one drain pass runs at a time. Entries are uploaded one by one
//! from a snapshot; a soft rejection bumps the entry's retry counter, and a
//! transport failure ends the pass so a dead connection is not hammered.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use super::connectivity::Connectivity;
use super::entry::{QueueEntry, UploadFile};
use super::notify::{Notification, Notifier, Severity};
use super::status::QueueStatus;
use super::store::QueueStore;

/// Soft rejections an entry may accumulate before it is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Hard failure of an upload attempt.
///
/// Returned only when the attempt itself broke (transport fault, unexpected
/// error). A completed attempt that the backend refused is `Ok(None)`.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload transport failed: {0}")]
    Transport(String),
    #[error("Upload failed unexpectedly: {0}")]
    Unexpected(String),
}

/// The upload operation the queue replays entries against.
///
/// Three outcomes, and the queue depends on the distinction:
/// - `Ok(Some(record))`: uploaded, the entry is removed;
/// - `Ok(None)`: rejected without a transport fault, the entry is retried
///   on a later pass;
/// - `Err(_)`: transport fault, the current pass stops.
#[allow(async_fn_in_trait)]
pub trait UploadOperation<O> {
    /// Application-defined record describing the uploaded file.
    type Record;

    async fn upload(&self, file: &UploadFile, options: &O)
        -> Result<Option<Self::Record>, UploadError>;
}

/// Why a drain pass did not look at the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDraining,
    Offline,
    StorageUnavailable,
}

/// Outcome of one `process_queue` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries uploaded and removed.
    pub uploaded: usize,
    /// Entries rejected and kept for another pass.
    pub retried: usize,
    /// Entries removed after reaching the retry ceiling.
    pub abandoned: usize,
    /// The pass ended before the end of its snapshot.
    pub stopped_early: bool,
    /// Set when the pass never read the queue.
    pub skipped: Option<SkipReason>,
}

impl DrainReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// Why a pass stopped before the end of its snapshot.
enum PassStop {
    Transport,
    Storage,
}

/// Holds the in-flight flag for the lifetime of one drain pass.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Offline-capable upload queue.
///
/// `O` is the caller's upload options type; the queue stores and forwards
/// it but never inspects it.
pub struct UploadQueue<O, S, U, C, N> {
    store: S,
    uploader: U,
    connectivity: C,
    notifier: N,
    max_retries: u32,
    draining: AtomicBool,
    pending: watch::Sender<usize>,
    status: watch::Sender<QueueStatus>,
    _options: PhantomData<fn() -> O>,
}

impl<O, S, U, C, N> UploadQueue<O, S, U, C, N>
where
    S: QueueStore<O>,
    U: UploadOperation<O>,
    C: Connectivity,
    N: Notifier,
{
    pub fn new(store: S, uploader: U, connectivity: C, notifier: N) -> Self {
        let (pending, _) = watch::channel(0);
        let (status, _) = watch::channel(QueueStatus::Idle);
        Self {
            store,
            uploader,
            connectivity,
            notifier,
            max_retries: DEFAULT_MAX_RETRIES,
            draining: AtomicBool::new(false),
            pending,
            status,
            _options: PhantomData,
        }
    }

    /// Override the retry ceiling (minimum 1).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Pending count as last read from the store.
    pub fn pending(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<QueueStatus> {
        self.status.subscribe()
    }

    /// Whether a drain pass currently holds the in-flight flag.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Persist a file for a later drain pass.
    ///
    /// Never uploads directly, even when online. Returns the new entry id,
    /// or `None` if the file was empty or could not be stored (the user is
    /// notified either way).
    pub async fn enqueue(&self, file: UploadFile, options: O) -> Option<String> {
        if file.is_empty() {
            log::warn!("Refusing to queue empty file {}", file.name);
            self.notifier.notify(Notification::new(
                "Nothing to upload",
                format!("\"{}\" is empty", file.name),
                Severity::Error,
            ));
            return None;
        }

        let entry = QueueEntry::new(file, options);
        if let Err(e) = self.store.put(&entry).await {
            log::error!(
                "Failed to queue upload {} ({}): {}",
                entry.file_name,
                entry.id,
                e
            );
            self.status.send_replace(QueueStatus::StorageUnavailable);
            self.notifier.notify(Notification::queue_failed(&entry.file_name));
            return None;
        }

        log::info!(
            "Queued upload {} ({}, {} bytes)",
            entry.file_name,
            entry.id,
            entry.payload.len()
        );
        self.refresh_count().await;
        self.notifier.notify(Notification::queued(&entry.file_name));
        Some(entry.id)
    }

    /// Run one drain pass over a snapshot of the queue.
    ///
    /// No-op while another pass is running or the device is offline. Never
    /// fails outward; the report says what happened.
    pub async fn process_queue(&self) -> DrainReport {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            log::debug!("Queue drain already in progress, skipping");
            return DrainReport::skipped(SkipReason::AlreadyDraining);
        };

        if !self.connectivity.is_online() {
            log::debug!("Offline, deferring queue drain");
            self.status.send_replace(QueueStatus::Offline);
            return DrainReport::skipped(SkipReason::Offline);
        }

        let snapshot = match self.store.get_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Cannot read upload queue: {}", e);
                self.status.send_replace(QueueStatus::StorageUnavailable);
                return DrainReport::skipped(SkipReason::StorageUnavailable);
            }
        };

        if snapshot.is_empty() {
            self.status.send_replace(QueueStatus::Idle);
            return DrainReport::default();
        }

        log::info!("Processing {} queued uploads", snapshot.len());
        self.status.send_replace(QueueStatus::Draining);

        let mut report = DrainReport::default();
        let mut stop = None;
        for entry in snapshot {
            if let Err(reason) = self.drain_entry(entry, &mut report).await {
                stop = Some(reason);
                break;
            }
        }
        report.stopped_early = stop.is_some();

        self.refresh_count().await;
        if report.uploaded > 0 {
            self.notifier.notify(Notification::uploaded(report.uploaded));
        }

        let status = match stop {
            Some(PassStop::Storage) => QueueStatus::StorageUnavailable,
            Some(PassStop::Transport) | None => QueueStatus::Idle,
        };
        self.status.send_replace(status);

        log::info!(
            "Queue drain finished: {} uploaded, {} retrying, {} abandoned{}",
            report.uploaded,
            report.retried,
            report.abandoned,
            if report.stopped_early { " (stopped early)" } else { "" }
        );
        report
    }

    /// Attempt one entry and record the outcome in the store.
    async fn drain_entry(
        &self,
        mut entry: QueueEntry<O>,
        report: &mut DrainReport,
    ) -> Result<(), PassStop> {
        // The ceiling may have been lowered since this entry was last tried.
        if entry.retry_count >= self.max_retries {
            return self.abandon(&entry, report).await;
        }

        let file = UploadFile::new(
            entry.file_name.clone(),
            entry.mime_type.clone(),
            std::mem::take(&mut entry.payload),
        );
        let outcome = self.uploader.upload(&file, &entry.upload_options).await;
        entry.payload = file.bytes;

        match outcome {
            Ok(Some(_record)) => {
                report.uploaded += 1;
                if let Err(e) = self.store.delete(&entry.id).await {
                    // Still queued, so the next pass uploads it again.
                    log::error!(
                        "Uploaded {} ({}) but could not remove it from the queue: {}",
                        entry.file_name,
                        entry.id,
                        e
                    );
                    return Err(PassStop::Storage);
                }
                log::info!("Queued upload processed: {} ({})", entry.file_name, entry.id);
                Ok(())
            }
            Ok(None) => {
                entry.retry_count = entry.retry_count.saturating_add(1);
                if entry.retry_count < self.max_retries {
                    log::warn!(
                        "Queued upload retry {}/{}: {} ({}) - rejected",
                        entry.retry_count,
                        self.max_retries,
                        entry.file_name,
                        entry.id
                    );
                    if let Err(e) = self.store.put(&entry).await {
                        log::error!("Failed to update queued upload {}: {}", entry.id, e);
                        return Err(PassStop::Storage);
                    }
                    report.retried += 1;
                    Ok(())
                } else {
                    self.abandon(&entry, report).await
                }
            }
            Err(e) => {
                log::warn!(
                    "Upload of {} ({}) failed, ending this pass: {}",
                    entry.file_name,
                    entry.id,
                    e
                );
                Err(PassStop::Transport)
            }
        }
    }

    /// Drop an entry that has used up its retries. Not surfaced to the user.
    async fn abandon(
        &self,
        entry: &QueueEntry<O>,
        report: &mut DrainReport,
    ) -> Result<(), PassStop> {
        log::error!(
            "Queued upload dropped after {} rejections: {} ({})",
            entry.retry_count,
            entry.file_name,
            entry.id
        );
        if let Err(e) = self.store.delete(&entry.id).await {
            log::error!("Failed to drop queued upload {}: {}", entry.id, e);
            return Err(PassStop::Storage);
        }
        report.abandoned += 1;
        Ok(())
    }

    /// Re-read the pending count from the store and publish it.
    pub async fn refresh_count(&self) -> Option<usize> {
        match self.store.count().await {
            Ok(count) => {
                self.pending.send_replace(count);
                Some(count)
            }
            Err(e) => {
                log::warn!("Failed to read upload queue count: {}", e);
                None
            }
        }
    }

    /// Trigger loop: drain on start when online, on every transition back
    /// online, and whenever `retry_now` receives a message.
    ///
    /// Returns once the connectivity source is dropped. A closed `retry_now`
    /// channel just disables manual triggers.
    pub async fn run(&self, mut retry_now: mpsc::Receiver<()>) {
        let mut online_rx = self.connectivity.subscribe();
        let online = *online_rx.borrow_and_update();

        log::info!(
            "Upload queue started ({})",
            if online { "online" } else { "offline" }
        );

        self.refresh_count().await;
        if online {
            self.process_queue().await;
        } else {
            self.status.send_replace(QueueStatus::Offline);
        }

        loop {
            tokio::select! {
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        log::info!("Connectivity source closed, upload queue stopping");
                        break;
                    }
                    let now_online = *online_rx.borrow_and_update();
                    if now_online {
                        log::info!("Back online, draining upload queue");
                        self.process_queue().await;
                    } else {
                        self.status.send_replace(QueueStatus::Offline);
                    }
                }
                Some(()) = retry_now.recv() => {
                    log::info!("Manual queue drain triggered");
                    self.process_queue().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod guard_tests {
    use super::*;

    #[test]
    fn test_drain_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let guard = DrainGuard::acquire(&flag);
            assert!(guard.is_some());
            assert!(DrainGuard::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(DrainGuard::acquire(&flag).is_some());
    }
}
