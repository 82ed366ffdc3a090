//! Haul is a crate managing a queue of concurrent file downloads.
//!
//! Downloads are started, paused, resumed, cancelled and removed through a
//! [`DownloadManager`]. Every lifecycle transition is reported to an optional
//! [`Observer`], while the network work is delegated to a [`TransferClient`]
//! ([`HttpTransferClient`] by default).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use haul::{DownloadManagerBuilder, ProgressDisplay};
//! use reqwest::Url;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let display = Arc::new(ProgressDisplay::default());
//! let manager = DownloadManagerBuilder::new().observer(&display).build()?;
//!
//! let reqwest_rs = "https://github.com/seanmonstar/reqwest/archive/refs/tags/v0.11.9.zip";
//! let id = manager.start(Url::parse(reqwest_rs)?, "output");
//!
//! manager.pause(id)?;
//! manager.resume(id)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`download`] - The `DownloadRecord` entity and its `DownloadState` machine
//! - [`registry`] - The concurrency-safe store of records
//! - [`manager`] - The `DownloadManager` and `DownloadManagerBuilder`
//! - [`transfer`] - The `TransferClient` seam the manager drives
//! - [`observer`] - Lifecycle notifications and the `TracingObserver`
//! - [`http`] - The default HTTP transfer client
//! - [`progress`] - Progress bar observer and styling
//! - [`error`] - Centralized error handling with the `Error` enum
//! - [`utils`] - Shared utility functions

pub mod download;
pub mod error;
pub mod http;
pub mod manager;
pub mod observer;
pub mod progress;
pub mod registry;
pub mod transfer;
pub mod utils;

pub use download::{DownloadId, DownloadRecord, DownloadState};
pub use error::{Error, Result};
pub use http::{
    create_http_client, HttpClientConfig, HttpResumeData, HttpTransferClient, DEFAULT_SUSPEND_TIMEOUT,
};
pub use manager::{DownloadManager, DownloadManagerBuilder, ManagerConfig};
pub use observer::{DownloadEvent, Notification, Observer, TracingObserver};
pub use progress::{ProgressBarOpts, ProgressDisplay, StyleOptions};
pub use registry::Registry;
pub use transfer::{
    Metadata, ResumeData, Transfer, TransferClient, TransferError, TransferEvent, TransferHandle,
};
pub use utils::{filename_from_url, parse_content_range_total};
