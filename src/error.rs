//! Error handling for the haul library.
//!
//! Transport failures that happen after [`DownloadManager::start`] returned
//! never come back through this type: they end up in the record's
//! [`DownloadState::Failed`] state and in an observer notification. The
//! variants below are what command handlers and transfer clients return
//! synchronously.
//!
//! [`DownloadManager::start`]: crate::manager::DownloadManager::start
//! [`DownloadState::Failed`]: crate::download::DownloadState::Failed

use crate::download::DownloadId;

use std::io;
use thiserror::Error;

/// Errors that can happen when using haul.
#[derive(Error, Debug)]
pub enum Error {
    /// The transfer client could not resolve the filename or content type of a URL.
    #[error("Metadata resolution failed: {0}")]
    MetadataResolutionFailed(String),

    /// The transfer client could not open (or reopen) the byte transfer.
    #[error("Transfer could not be opened: {0}")]
    TransferOpenFailed(String),

    /// A transfer terminated with an error.
    ///
    /// Built from a failed record's reason by [`DownloadRecord::failure`].
    ///
    /// [`DownloadRecord::failure`]: crate::download::DownloadRecord::failure
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// A paused download has neither a live transfer handle nor saved resume
    /// data, so there is nothing to resume from.
    #[error("Download {0} cannot be resumed: no live transfer and no resume data")]
    ResumeImpossible(DownloadId),

    /// No record with this identity is managed (never existed or removed).
    #[error("Download {0} not found")]
    RecordNotFound(DownloadId),

    /// A record with this identity is already registered.
    #[error("Download {0} is already registered")]
    DuplicateIdentity(DownloadId),

    /// Only failed or cancelled downloads can be retried.
    #[error("Download {0} is not in a retryable state")]
    NotRetryable(DownloadId),

    /// Error from the underlying URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Resume data handed to a transfer client was not produced by it.
    #[error("Invalid resume data: {0}")]
    InvalidResumeData(String),

    /// I/O Error.
    #[error("I/O error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },
}

/// Result type alias for operations that can fail with a haul error.
pub type Result<T> = std::result::Result<T, Error>;
