//! Manager module containing the download queue, its builder and configuration.
//!
//! This module provides the main [`DownloadManager`] struct and the
//! [`DownloadManagerBuilder`] used to configure it. The manager tracks every
//! download in a [`Registry`](crate::registry::Registry), drives transfers
//! through a [`TransferClient`](crate::transfer::TransferClient) and reports
//! each lifecycle transition to an optional [`Observer`](crate::observer::Observer).
//!
//! # Overview
//!
//! - `manager` - Core `DownloadManager` with the lifecycle commands
//! - `builder` - `DownloadManagerBuilder` for configuring the manager
//! - `config` - `ManagerConfig` holding the HTTP settings
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use haul::manager::DownloadManagerBuilder;
//! use reqwest::Url;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DownloadManagerBuilder::new().build()?;
//! let id = manager.start(
//!     Url::parse("https://github.com/seanmonstar/reqwest/archive/refs/tags/v0.11.9.zip")?,
//!     "output",
//! );
//! println!("{:?}", manager.get(id).map(|record| record.state().clone()));
//! # Ok(())
//! # }
//! ```
//!
//! ## With a Progress Display
//!
//! ```rust,no_run
//! use haul::manager::DownloadManagerBuilder;
//! use haul::progress::ProgressDisplay;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), haul::Error> {
//! let display = Arc::new(ProgressDisplay::default());
//! let manager = DownloadManagerBuilder::new()
//!     .retries(5)
//!     .observer(&display)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod manager;

pub use builder::DownloadManagerBuilder;
pub use config::ManagerConfig;
pub use manager::DownloadManager;
