//! Lifecycle state of a managed download.
//!
//! ```text
//! Pending ──► Downloading ──► Completed
//!    │          │   ▲    └──► Failed
//!    │          ▼   │
//!    │         Paused ──────► Failed
//!    └──────────┴──────┴────► Cancelled
//! ```
//!
//! `Completed`, `Failed` and `Cancelled` are terminal: a record never leaves
//! them. Retrying a failed download creates a new record.

use std::fmt;

/// Download state enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadState {
    /// Created, waiting for its transfer to open.
    Pending,
    /// A transfer is moving bytes.
    Downloading {
        /// Last authoritative progress fraction, between 0 and 1.
        progress: f64,
    },
    /// Suspended by the user; resumable in place or from saved resume data.
    Paused,
    /// The transfer finished successfully.
    Completed,
    /// The transfer could not be opened or ended with an error.
    Failed(String),
    /// Cancelled by the user.
    Cancelled,
}

impl DownloadState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadState::Completed | DownloadState::Failed(_) | DownloadState::Cancelled
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DownloadState::Pending)
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self, DownloadState::Downloading { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, DownloadState::Paused)
    }

    /// Whether [`retry`](crate::manager::DownloadManager::retry) accepts a
    /// record in this state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadState::Failed(_) | DownloadState::Cancelled)
    }

    /// The failure reason, if the download failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DownloadState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadState::Pending => write!(f, "pending"),
            DownloadState::Downloading { progress } => {
                write!(f, "downloading ({:.0}%)", progress * 100.0)
            }
            DownloadState::Paused => write!(f, "paused"),
            DownloadState::Completed => write!(f, "completed"),
            DownloadState::Failed(reason) => write!(f, "failed: {}", reason),
            DownloadState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(DownloadState::Completed.is_terminal());
        assert!(DownloadState::Failed("boom".into()).is_terminal());
        assert!(DownloadState::Cancelled.is_terminal());

        assert!(!DownloadState::Pending.is_terminal());
        assert!(!DownloadState::Paused.is_terminal());
        assert!(!DownloadState::Downloading { progress: 0.5 }.is_terminal());
    }

    #[test]
    fn test_retryable_states() {
        assert!(DownloadState::Failed("reset".into()).is_retryable());
        assert!(DownloadState::Cancelled.is_retryable());
        assert!(!DownloadState::Completed.is_retryable());
        assert!(!DownloadState::Paused.is_retryable());
    }

    #[test]
    fn test_failure_reason() {
        let state = DownloadState::Failed("connection reset".to_string());
        assert_eq!(state.failure_reason(), Some("connection reset"));
        assert_eq!(DownloadState::Completed.failure_reason(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(DownloadState::Pending.to_string(), "pending");
        assert_eq!(
            DownloadState::Downloading { progress: 0.4 }.to_string(),
            "downloading (40%)"
        );
        assert_eq!(
            DownloadState::Failed("dns error".into()).to_string(),
            "failed: dns error"
        );
    }
}
