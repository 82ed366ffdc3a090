//! Progress module containing the terminal progress bar observer.
//!
//! # Overview
//!
//! - `style` - Progress bar styling options and templates
//! - `display` - [`ProgressDisplay`], an [`Observer`](crate::observer::Observer)
//!   drawing one bar per download
//!
//! # Examples
//!
//! ## Custom Progress Bar Styling
//!
//! ```rust
//! use haul::progress::{ProgressBarOpts, ProgressDisplay, StyleOptions};
//!
//! let mut child = ProgressBarOpts::with_line_style();
//! child.set_clear(false);
//!
//! let display = ProgressDisplay::new(StyleOptions::new(
//!     ProgressBarOpts::new(
//!         Some("[{bar:40.cyan/blue}] {pos}/{len}".to_string()),
//!         Some(ProgressBarOpts::CHARS_ROUGH.to_string()),
//!         true,
//!         false,
//!     ),
//!     child,
//! ));
//! ```
//!
//! ## Hidden Progress Bars
//!
//! ```rust
//! use haul::progress::ProgressDisplay;
//!
//! // Counts progress without drawing, handy in tests.
//! let display = ProgressDisplay::hidden();
//! assert_eq!(display.main().position(), 0);
//! ```

pub(crate) mod display;
pub(crate) mod style;

pub use display::ProgressDisplay;
pub use style::{ProgressBarOpts, StyleOptions};
