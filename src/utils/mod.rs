//! Shared utility functions.
//!
//! This module contains the helpers the HTTP transfer client relies on to
//! interpret server responses.
//!
//! # Overview
//!
//! - [`content_length`] - Total size and progress computation from HTTP responses
//! - [`filename`] - Filename resolution from `Content-Disposition` headers and URLs
//!
//! # Examples
//!
//! ## Parsing Content-Range Headers
//!
//! ```rust
//! use haul::utils::parse_content_range_total;
//!
//! // Extract total size from a Content-Range header
//! let header_value = "bytes 0-1023/2048";
//! if let Some(total_size) = parse_content_range_total(header_value) {
//!     println!("Total file size: {} bytes", total_size);
//! }
//! ```
//!
//! ## Naming a Download
//!
//! ```rust
//! use haul::utils::filename_from_url;
//! use reqwest::Url;
//!
//! let url = Url::parse("https://example.com/archive/v0.11.9.zip").unwrap();
//! assert_eq!(filename_from_url(&url).as_deref(), Some("v0.11.9.zip"));
//! ```

pub mod content_length;
pub mod filename;

// Re-export commonly used utilities
pub use content_length::{parse_content_range_total, progress_fraction, total_length};
pub use filename::{filename_from_content_disposition, filename_from_url};
