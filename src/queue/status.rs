//! Status state machine for the upload queue badge.
//!
//! Published alongside the pending count so the UI can show what the queue
//! is doing, not just how much is waiting.

/// All possible states of the upload queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Not draining; anything pending waits for the next trigger.
    Idle,
    /// A drain pass is uploading queued items.
    Draining,
    /// Device reported offline on the last trigger.
    Offline,
    /// The queue store could not be read or written.
    StorageUnavailable,
}

impl QueueStatus {
    /// Human-readable status text for the queue badge.
    pub fn label(&self) -> &str {
        match self {
            QueueStatus::Idle => "Idle",
            QueueStatus::Draining => "Uploading...",
            QueueStatus::Offline => "Waiting for connection",
            QueueStatus::StorageUnavailable => "Storage unavailable",
        }
    }

    /// Returns `true` when the queue cannot make progress until something
    /// outside it changes (connectivity or storage).
    pub fn is_blocked(&self) -> bool {
        matches!(self, QueueStatus::Offline | QueueStatus::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(QueueStatus::Idle.label(), "Idle");
        assert_eq!(QueueStatus::Draining.label(), "Uploading...");
        assert_eq!(QueueStatus::Offline.label(), "Waiting for connection");
        assert_eq!(QueueStatus::StorageUnavailable.label(), "Storage unavailable");
    }

    #[test]
    fn test_is_blocked() {
        assert!(!QueueStatus::Idle.is_blocked());
        assert!(!QueueStatus::Draining.is_blocked());
        assert!(QueueStatus::Offline.is_blocked());
        assert!(QueueStatus::StorageUnavailable.is_blocked());
    }
}
