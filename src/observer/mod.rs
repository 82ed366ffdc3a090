//! Lifecycle notifications.
//!
//! The [`DownloadManager`] reports every state transition to a single
//! [`Observer`] as a [`Notification`]: the [`DownloadEvent`] that happened, a
//! snapshot of the affected record, and the position the record had in the
//! listing at that instant.
//!
//! The manager only keeps a weak reference to its observer. Dropping the
//! observer silently stops notifications.
//!
//! # Examples
//!
//! ```rust
//! use haul::observer::{Notification, Observer};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct FinishedCounter(AtomicUsize);
//!
//! impl Observer for FinishedCounter {
//!     fn notify(&self, notification: &Notification) {
//!         if notification.event().is_finished() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```
//!
//! [`DownloadManager`]: crate::manager::DownloadManager

use crate::download::DownloadRecord;

use std::fmt;
use tracing::{debug, info, warn};

/// Lifecycle transition of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadEvent {
    /// The transfer opened and the download moved to `Downloading`.
    Started,
    /// New authoritative progress was applied.
    Progress,
    /// The download was paused.
    Paused,
    /// The download was resumed, in place or from saved resume data.
    Resumed,
    /// The transfer finished successfully.
    FinishedSuccess,
    /// The transfer could not be opened or ended with an error.
    FinishedError,
    /// The download was cancelled.
    Cancelled,
    /// The record was removed from the manager.
    Removed,
}

impl DownloadEvent {
    /// Whether the event is a terminal transfer result.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            DownloadEvent::FinishedSuccess | DownloadEvent::FinishedError
        )
    }
}

impl fmt::Display for DownloadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadEvent::Started => "started",
            DownloadEvent::Progress => "progress",
            DownloadEvent::Paused => "paused",
            DownloadEvent::Resumed => "resumed",
            DownloadEvent::FinishedSuccess => "finished",
            DownloadEvent::FinishedError => "failed",
            DownloadEvent::Cancelled => "cancelled",
            DownloadEvent::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// One lifecycle notification.
#[derive(Debug, Clone)]
pub struct Notification {
    event: DownloadEvent,
    position: usize,
    record: DownloadRecord,
}

impl Notification {
    pub fn new(event: DownloadEvent, position: usize, record: DownloadRecord) -> Self {
        Self {
            event,
            position,
            record,
        }
    }

    pub fn event(&self) -> DownloadEvent {
        self.event
    }

    /// Position of the record when the event happened. For
    /// [`DownloadEvent::Removed`] this is the position it was removed from.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Snapshot of the record right after the transition.
    pub fn record(&self) -> &DownloadRecord {
        &self.record
    }
}

/// Sink for lifecycle notifications.
///
/// `notify` is called from whichever task performed the transition, never
/// while the manager holds a lock. It should return quickly; a panic is
/// caught and logged by the manager.
///
/// Notifications about one download are not guaranteed to arrive in
/// transition order: a `pause` from the caller can be delivered before the
/// `Started` of the spawned task, and a `Progress` can trail a `Paused`.
/// Compare [`DownloadRecord::revision`] to tell which snapshot is newer.
///
/// [`DownloadRecord::revision`]: crate::download::DownloadRecord::revision
pub trait Observer: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Observer writing every notification to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Observer for TracingObserver {
    fn notify(&self, notification: &Notification) {
        let record = notification.record();
        let label = record.label();
        match notification.event() {
            DownloadEvent::Progress => debug!(
                id = %record.id(),
                position = notification.position(),
                progress = record.progress(),
                "{}", label
            ),
            DownloadEvent::FinishedError => warn!(
                id = %record.id(),
                position = notification.position(),
                state = %record.state(),
                "{} failed", label
            ),
            event => info!(
                id = %record.id(),
                position = notification.position(),
                "{} {}", label, event
            ),
        }
    }
}
