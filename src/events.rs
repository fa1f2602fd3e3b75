//! # Router Notifications
//!
//! Page-wide, fire-and-forget lifecycle events. Any number of listeners can
//! subscribe (progress bars, analytics); nobody is waited on.

use log::trace;
use tokio::sync::broadcast;

use crate::error::RouterError;

/// Capacity of the notification channel. Slow listeners lag, they never block the router.
const EVENT_CAPACITY: usize = 256;

/// Byte-level progress of the document fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchProgress {
    /// `received / length * 100`. NaN without a Content-Length; may exceed 100.
    pub progress: f64,
    /// Bytes received so far.
    pub received: u64,
    /// Content-Length, or 0 when the server did not send one.
    pub length: u64,
}

#[derive(Debug, Clone)]
pub enum RouterEvent {
    FetchStart,
    FetchProgress(FetchProgress),
    End,
    Error(RouterError),
}

/// Sending half shared by the router and the progress stream.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<RouterEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }

    /// Broadcasts `event`. Having no listeners is fine.
    pub fn emit(&self, event: RouterEvent) {
        if self.tx.send(event).is_err() {
            trace!("router event dropped: no subscribers");
        }
    }
}
