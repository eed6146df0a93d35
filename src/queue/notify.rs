//! User-facing notifications emitted by the queue.
//!
//! Fire-and-forget: a notifier cannot fail from the queue's point of view.

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A toast/banner message for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    /// Confirmation that a file was saved for later upload.
    pub fn queued(file_name: &str) -> Self {
        Self::new(
            "Saved for later",
            format!("\"{}\" will upload when you're back online", file_name),
            Severity::Info,
        )
    }

    /// The queue could not persist a file; it has not been saved.
    pub fn queue_failed(file_name: &str) -> Self {
        Self::new(
            "Couldn't save for later",
            format!("\"{}\" could not be stored on this device. Please try again.", file_name),
            Severity::Error,
        )
    }

    /// Aggregate result of one drain pass.
    pub fn uploaded(count: usize) -> Self {
        let noun = if count == 1 { "item" } else { "items" };
        Self::new(
            "Uploads complete",
            format!("{} queued {} uploaded", count, noun),
            Severity::Success,
        )
    }
}

/// Sink for queue notifications.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => log::warn!("{}: {}", notification.title, notification.description),
            Severity::Info | Severity::Success => {
                log::info!("{}: {}", notification.title, notification.description)
            }
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploaded_pluralization() {
        assert_eq!(Notification::uploaded(1).description, "1 queued item uploaded");
        assert_eq!(Notification::uploaded(3).description, "3 queued items uploaded");
        assert_eq!(Notification::uploaded(3).severity, Severity::Success);
    }

    #[test]
    fn test_queue_failed_is_error() {
        let n = Notification::queue_failed("photo.jpg");
        assert_eq!(n.severity, Severity::Error);
        assert!(n.description.contains("photo.jpg"));
    }
}
