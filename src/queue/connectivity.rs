//! Connectivity signal consumed by the upload queue.
//!
//! Binary only: "is the device online" plus a subscription that fires on
//! transitions. No network-quality probing.

use tokio::sync::watch;

/// Source of the device's online/offline state.
pub trait Connectivity {
    /// Whether the device currently reports itself online.
    fn is_online(&self) -> bool;

    /// Subscribe to online/offline transitions.
    ///
    /// The receiver's value is the current state; `changed()` resolves on
    /// each transition and errors once the source is gone.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// In-process connectivity state, driven by whoever observes the network
/// (a platform callback, a failed request, or a test).
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Record the current state. Subscribers are only woken on a transition.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                log::info!("Connectivity restored");
            } else {
                log::info!("Connectivity lost");
            }
        }
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl<C: Connectivity + ?Sized> Connectivity for std::sync::Arc<C> {
    fn is_online(&self) -> bool {
        (**self).is_online()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        (**self).subscribe()
    }
}
