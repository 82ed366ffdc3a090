//! The transfer client seam.
//!
//! A [`TransferClient`] performs the actual network I/O on behalf of the
//! [`DownloadManager`]. It resolves metadata, opens byte transfers and reopens
//! them from opaque [`ResumeData`]. Every opened transfer is represented by a
//! [`Transfer`]: a [`TransferHandle`] the manager uses to suspend, resume or
//! cancel it, and a channel of [`TransferEvent`]s carrying progress fractions
//! and exactly one terminal result.
//!
//! The crate ships [`HttpTransferClient`]; tests and embedders can plug in
//! any other implementation.
//!
//! [`DownloadManager`]: crate::manager::DownloadManager
//! [`HttpTransferClient`]: crate::http::HttpTransferClient

use crate::error::Result;

use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Filename and content type resolved for a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Name the file should be saved under.
    pub filename: Option<String>,
    /// MIME type announced by the server.
    pub content_type: Option<String>,
}

impl Metadata {
    /// Creates metadata with both fields set.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
        }
    }
}

/// Opaque state allowing a transfer to continue where it stopped.
///
/// Only the [`TransferClient`] that produced it knows how to read it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResumeData(Vec<u8>);

impl ResumeData {
    /// Wraps raw resume bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ResumeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResumeData({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for ResumeData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Terminal error reported by a transfer.
///
/// A transfer interrupted in a resumable way attaches the [`ResumeData`]
/// needed to continue it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TransferError {
    reason: String,
    resume_data: Option<ResumeData>,
}

impl TransferError {
    /// Creates an error with a human-readable reason.
    pub fn new(reason: impl fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
            resume_data: None,
        }
    }

    /// Attaches resume data to the error.
    pub fn with_resume_data(self, resume_data: ResumeData) -> Self {
        Self {
            resume_data: Some(resume_data),
            ..self
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn resume_data(&self) -> Option<&ResumeData> {
        self.resume_data.as_ref()
    }

    pub fn into_resume_data(self) -> Option<ResumeData> {
        self.resume_data
    }
}

/// Event emitted by a live transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// Fraction of the transfer completed, between 0 and 1.
    Progress(f64),
    /// The transfer ended. Sent at most once, always last.
    Finished(std::result::Result<(), TransferError>),
}

/// Control surface of one live transfer.
///
/// Implementations must not block and must not call back into the
/// [`DownloadManager`](crate::manager::DownloadManager): the manager invokes
/// these methods while it holds its registry lock.
pub trait TransferHandle: Send + Sync {
    /// Stops moving bytes, keeping the transfer alive.
    fn suspend(&self);

    /// Continues a suspended transfer.
    fn resume(&self);

    /// Aborts the transfer. The transport may still deliver a terminal
    /// event afterwards.
    fn cancel(&self);

    /// Whether the transfer is currently suspended.
    fn is_suspended(&self) -> bool;
}

/// Receiving side of a transfer's event stream.
pub type TransferEvents = mpsc::UnboundedReceiver<TransferEvent>;

/// A transfer that has been opened by a [`TransferClient`].
pub struct Transfer {
    /// Handle controlling the transfer.
    pub handle: Arc<dyn TransferHandle>,
    /// Progress and completion events, in the order they occurred.
    pub events: TransferEvents,
}

impl Transfer {
    pub fn new(handle: Arc<dyn TransferHandle>, events: TransferEvents) -> Self {
        Self { handle, events }
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("suspended", &self.handle.is_suspended())
            .finish_non_exhaustive()
    }
}

/// Performs network I/O for the download manager.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Resolves the filename and content type of `url`.
    async fn resolve_metadata(&self, url: &Url) -> Result<Metadata>;

    /// Opens a transfer of `url` into the `destination` folder.
    ///
    /// `filename` is the name resolved by [`resolve_metadata`], when it
    /// succeeded.
    ///
    /// [`resolve_metadata`]: TransferClient::resolve_metadata
    async fn open_transfer(
        &self,
        url: &Url,
        destination: &Path,
        filename: Option<&str>,
    ) -> Result<Transfer>;

    /// Reopens a transfer from resume data previously produced by this client.
    async fn resume_transfer(&self, resume_data: ResumeData, destination: &Path)
        -> Result<Transfer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_data_debug_hides_content() {
        let data = ResumeData::new(b"secret offsets".to_vec());
        assert_eq!(format!("{:?}", data), "ResumeData(14 bytes)");
        assert_eq!(data.len(), 14);
        assert!(!data.is_empty());
    }

    #[test]
    fn test_transfer_error_display_is_reason() {
        let error = TransferError::new("connection reset by peer");
        assert_eq!(error.to_string(), "connection reset by peer");
        assert!(error.resume_data().is_none());
    }

    #[test]
    fn test_transfer_error_with_resume_data() {
        let error = TransferError::new("timed out").with_resume_data(ResumeData::new(vec![1, 2]));
        assert_eq!(error.reason(), "timed out");
        assert_eq!(error.into_resume_data(), Some(ResumeData::new(vec![1, 2])));
    }
}
