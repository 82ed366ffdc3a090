//! Progress bar styling and configuration options.
//!
//! The [`ProgressDisplay`](super::ProgressDisplay) draws a main bar counting
//! finished downloads and one child bar per download, showing its progress
//! fraction.
//!
//! # Examples
//!
//! ## Default Styling
//!
//! ```rust
//! use haul::progress::StyleOptions;
//!
//! // The main bar stays visible, child bars clear on completion.
//! let style_options = StyleOptions::default();
//! assert!(style_options.is_enabled());
//! ```
//!
//! ## Custom Styling
//!
//! ```rust
//! use haul::progress::{ProgressBarOpts, StyleOptions};
//!
//! let custom_style = StyleOptions::new(
//!     ProgressBarOpts::new(
//!         Some("[{bar:40.cyan/blue}] {pos}/{len} {msg}".to_string()),
//!         Some(ProgressBarOpts::CHARS_FINE.to_string()),
//!         true,
//!         false,
//!     ),
//!     ProgressBarOpts::with_line_style(),
//! );
//! ```
//!
//! ## Hidden Progress Bars
//!
//! ```rust
//! use haul::progress::{ProgressBarOpts, StyleOptions};
//!
//! let hidden_style = StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden());
//! assert!(!hidden_style.is_enabled());
//! ```

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

/// Define the progress display style options.
///
/// By default, the main progress bar will stay on the screen upon completion,
/// but the child ones will be cleared once complete.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Style options for the main progress bar.
    pub(crate) main: ProgressBarOpts,
    /// Style options for the child progress bar(s).
    pub(crate) child: ProgressBarOpts,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            main: ProgressBarOpts {
                template: Some(ProgressBarOpts::TEMPLATE_FINISHED_COUNT.into()),
                progress_chars: Some(ProgressBarOpts::CHARS_FINE.into()),
                enabled: true,
                clear: false,
            },
            child: ProgressBarOpts::with_line_style(),
        }
    }
}

impl StyleOptions {
    /// Create new [`StyleOptions`].
    pub fn new(main: ProgressBarOpts, child: ProgressBarOpts) -> Self {
        Self { main, child }
    }

    /// Set the options for the main progress bar.
    pub fn set_main(&mut self, main: ProgressBarOpts) {
        self.main = main;
    }

    /// Set the options for the child progress bars.
    pub fn set_child(&mut self, child: ProgressBarOpts) {
        self.child = child;
    }

    /// Return `false` if neither the main nor the child bar is enabled.
    pub fn is_enabled(&self) -> bool {
        self.main.enabled || self.child.enabled
    }

    pub fn main(&self) -> &ProgressBarOpts {
        &self.main
    }

    pub fn child(&self) -> &ProgressBarOpts {
        &self.child
    }
}

/// Define the options for a progress bar.
#[derive(Debug, Clone)]
pub struct ProgressBarOpts {
    /// Progress bar template string.
    template: Option<String>,
    /// Progression characters set.
    ///
    /// There must be at least 3 characters for the following states:
    /// "filled", "current", and "to do".
    progress_chars: Option<String>,
    /// Enable or disable the progress bar.
    pub(crate) enabled: bool,
    /// Clear the progress bar once completed.
    pub(crate) clear: bool,
}

impl Default for ProgressBarOpts {
    fn default() -> Self {
        Self {
            template: None,
            progress_chars: None,
            enabled: true,
            clear: true,
        }
    }
}

impl ProgressBarOpts {
    /// Template counting finished downloads.
    ///
    /// `███████████████████████████████████████ 11/12 finished [00:01:02]`
    pub const TEMPLATE_FINISHED_COUNT: &'static str =
        "{bar:40.blue} {pos:>}/{len} finished [{elapsed_precise:.blue}]";
    /// Template showing the progress fraction of one download next to its name.
    ///
    /// `━━━━━━━━━━━━━━━━━━━━╾─────────────────── 52% a.zip`
    pub const TEMPLATE_FRACTION: &'static str =
        "{bar:40.green/black} {percent:>3.green}% {wide_msg}";
    /// Use fade-in blocks as progress characters: `"█▓▒░  "`.
    pub const CHARS_FADE_IN: &'static str = "█▓▒░  ";
    /// Use fine blocks as progress characters: `"█▉▊▋▌▍▎▏  "`.
    pub const CHARS_FINE: &'static str = "█▉▊▋▌▍▎▏  ";
    /// Use a line as progress characters: `"━╾─"`.
    pub const CHARS_LINE: &'static str = "━╾╴─";
    /// Use rough blocks as progress characters: `"█  "`.
    pub const CHARS_ROUGH: &'static str = "█  ";

    /// Create a new [`ProgressBarOpts`].
    pub fn new(
        template: Option<String>,
        progress_chars: Option<String>,
        enabled: bool,
        clear: bool,
    ) -> Self {
        Self {
            template,
            progress_chars,
            enabled,
            clear,
        }
    }

    /// Create a [`ProgressStyle`] based on the provided options.
    ///
    /// An invalid template falls back to the default bar.
    pub fn to_progress_style(&self) -> ProgressStyle {
        let mut style = match &self.template {
            Some(template) => ProgressStyle::with_template(template).unwrap_or_else(|e| {
                warn!("Invalid progress bar template {:?}: {}", template, e);
                ProgressStyle::default_bar()
            }),
            None => ProgressStyle::default_bar(),
        };
        if let Some(progress_chars) = &self.progress_chars {
            style = style.progress_chars(progress_chars);
        }
        style
    }

    /// Create a [`ProgressBar`] based on the provided options.
    ///
    /// A disabled bar is never drawn but still counts.
    pub fn to_progress_bar(&self, len: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
        }
        ProgressBar::new(len).with_style(self.to_progress_style())
    }

    /// Create a new [`ProgressBarOpts`] drawing a thin line with the percentage.
    pub fn with_line_style() -> Self {
        Self {
            template: Some(ProgressBarOpts::TEMPLATE_FRACTION.into()),
            progress_chars: Some(ProgressBarOpts::CHARS_LINE.into()),
            enabled: true,
            clear: true,
        }
    }

    /// Set to `true` to clear the progress bar upon completion.
    pub fn set_clear(&mut self, clear: bool) {
        self.clear = clear;
    }

    /// Create a new [`ProgressBarOpts`] which hides the progress bars.
    pub fn hidden() -> Self {
        Self {
            enabled: false,
            ..ProgressBarOpts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let bar = ProgressBarOpts::hidden().to_progress_bar(10);
        bar.inc(3);
        assert_eq!(bar.position(), 3);
        assert_eq!(bar.length(), Some(10));
    }

    #[test]
    fn test_invalid_template_falls_back() {
        let opts = ProgressBarOpts::new(Some("{bar:40.nope".to_string()), None, true, true);
        let _ = opts.to_progress_style();
    }
}
