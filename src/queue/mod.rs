//! Offline upload queue.
//!
//! Files the user tries to upload while offline (or whose upload failed) are
//! persisted in a local store and replayed when the device comes back
//! online. Delivery is at-least-once: an entry leaves the store only after
//! the upload operation confirms it, or after it has been rejected
//! `max_retries` times.

pub mod connectivity;
pub mod controller;
pub mod entry;
pub mod file_store;
pub mod notify;
pub mod status;
pub mod store;

pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use controller::{
    DrainReport, SkipReason, UploadError, UploadOperation, UploadQueue, DEFAULT_MAX_RETRIES,
};
pub use entry::{QueueEntry, UploadFile};
pub use file_store::{default_queue_dir, FileStore};
pub use notify::{LogNotifier, Notification, Notifier, Severity};
pub use status::QueueStatus;
pub use store::{MemoryStore, QueueStore, StoreError};
