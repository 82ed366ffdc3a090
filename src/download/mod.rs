//! Download records and their lifecycle state.
//!
//! - [`record`] - The [`DownloadRecord`] entity, its [`DownloadId`] and the
//!   transition methods the manager drives it with
//! - [`state`] - The [`DownloadState`] enum
//!
//! # Examples
//!
//! ```rust
//! use haul::download::DownloadState;
//!
//! let state = DownloadState::Downloading { progress: 0.4 };
//! assert!(!state.is_terminal());
//! assert_eq!(state.to_string(), "downloading (40%)");
//! ```

pub mod record;
pub mod state;

pub use record::{DownloadId, DownloadRecord};
pub use state::DownloadState;
