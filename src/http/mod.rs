//! HTTP module containing the default transfer client.
//!
//! # Overview
//!
//! - [`client`] - HTTP client creation and middleware configuration
//! - [`transfer`] - [`HttpTransferClient`], the [`TransferClient`] used by
//!   default, and its [`HttpResumeData`] format
//!
//! # Examples
//!
//! ## Plugging a Configured Client into the Manager
//!
//! ```rust
//! use haul::http::{create_http_client, HttpClientConfig, HttpTransferClient};
//! use haul::manager::DownloadManagerBuilder;
//! use reqwest::header::{HeaderMap, USER_AGENT};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "MyApp/1.0".parse()?);
//!
//! let config = HttpClientConfig {
//!     retries: 5,
//!     headers: Some(headers),
//!     ..HttpClientConfig::default()
//! };
//! let client = HttpTransferClient::with_client(
//!     create_http_client(config)?,
//!     Duration::from_secs(60),
//! );
//! let manager = DownloadManagerBuilder::new().client(Arc::new(client)).build()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TransferClient`]: crate::transfer::TransferClient

pub mod client;
pub mod transfer;

pub use client::{create_http_client, HttpClientConfig, DEFAULT_SUSPEND_TIMEOUT};
pub use transfer::{HttpResumeData, HttpTransferClient};
