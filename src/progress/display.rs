//! Terminal progress bars driven by lifecycle notifications.
//!
//! [`ProgressDisplay`] is an [`Observer`]: register it on the
//! [`DownloadManagerBuilder`] and it keeps one child bar per download plus a
//! main bar counting the finished ones.
//!
//! Notifications may arrive out of order. A snapshot older than the one a bar
//! already shows is skipped, and nothing brings back the bar of a removed
//! download.
//!
//! # Examples
//!
//! ```rust
//! use haul::manager::DownloadManagerBuilder;
//! use haul::progress::{ProgressDisplay, StyleOptions};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), haul::Error> {
//! let display = Arc::new(ProgressDisplay::new(StyleOptions::default()));
//! let manager = DownloadManagerBuilder::new().observer(&display).build()?;
//! // ... start downloads, wait for them ...
//! display.finish();
//! # Ok(())
//! # }
//! ```
//!
//! [`DownloadManagerBuilder`]: crate::manager::DownloadManagerBuilder

use crate::download::{DownloadId, DownloadRecord};
use crate::observer::{DownloadEvent, Notification, Observer};
use crate::progress::{ProgressBarOpts, StyleOptions};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Child bars count in thousandths of the transfer.
const SCALE: u64 = 1000;

struct Child {
    bar: ProgressBar,
    finished: bool,
    revision: u64,
}

#[derive(Default)]
struct Bars {
    children: HashMap<DownloadId, Child>,
    removed: HashSet<DownloadId>,
}

/// Progress display manager that coordinates multiple progress bars.
pub struct ProgressDisplay {
    /// The multi-progress instance for coordinating multiple progress bars.
    multi: MultiProgress,
    /// The main progress bar, counting finished downloads.
    main: ProgressBar,
    /// Child bar of every download seen so far, and the removed ids.
    bars: Mutex<Bars>,
    /// Style options for progress bars.
    style_options: StyleOptions,
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new(StyleOptions::default())
    }
}

impl fmt::Debug for ProgressDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("style_options", &self.style_options)
            .field("finished", &self.main.position())
            .finish_non_exhaustive()
    }
}

impl ProgressDisplay {
    /// Create a new progress display manager.
    pub fn new(style_options: StyleOptions) -> Self {
        let multi = match style_options.is_enabled() {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        let main = multi.add(style_options.main().to_progress_bar(0));
        main.tick();

        Self {
            multi,
            main,
            bars: Mutex::new(Bars::default()),
            style_options,
        }
    }

    /// A display that never draws anything.
    pub fn hidden() -> Self {
        Self::new(StyleOptions::new(
            ProgressBarOpts::hidden(),
            ProgressBarOpts::hidden(),
        ))
    }

    /// Get the main progress bar.
    pub fn main(&self) -> ProgressBar {
        self.main.clone()
    }

    /// Get the child progress bar of a download, if it has one.
    pub fn child(&self, id: DownloadId) -> Option<ProgressBar> {
        self.bars().children.get(&id).map(|child| child.bar.clone())
    }

    /// Finish the main progress bar, clearing or keeping it based on configuration.
    pub fn finish(&self) {
        if self.style_options.main().clear {
            self.main.finish_and_clear();
        } else {
            self.main.finish();
        }
    }

    fn bars(&self) -> MutexGuard<'_, Bars> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the child bar of `record`, creating it on first sight.
    /// Stale snapshots and removed downloads are skipped.
    fn with_child(&self, record: &DownloadRecord, f: impl FnOnce(&mut Child, &ProgressBar)) {
        let mut bars = self.bars();
        if bars.removed.contains(&record.id()) {
            return;
        }
        let child = bars.children.entry(record.id()).or_insert_with(|| {
            self.main.inc_length(1);
            let bar = self
                .multi
                .add(self.style_options.child().to_progress_bar(SCALE));
            Child {
                bar,
                finished: false,
                revision: 0,
            }
        });
        if child.revision != 0 && record.revision() <= child.revision {
            return;
        }
        child.revision = record.revision();
        f(child, &self.main);
    }

    fn position(record: &DownloadRecord) -> u64 {
        (record.progress() * SCALE as f64).round() as u64
    }

    fn finish_child(&self, child: &mut Child, main: &ProgressBar, message: String) {
        if child.finished {
            return;
        }
        child.finished = true;
        main.inc(1);
        if self.style_options.child().clear {
            child.bar.finish_and_clear();
        } else {
            child.bar.finish_with_message(message);
        }
    }
}

impl Observer for ProgressDisplay {
    fn notify(&self, notification: &Notification) {
        let record = notification.record();
        let label = record.label();
        match notification.event() {
            DownloadEvent::Started | DownloadEvent::Resumed | DownloadEvent::Progress => {
                self.with_child(record, |child, _| {
                    child.bar.set_position(Self::position(record));
                    child.bar.set_message(label);
                })
            }
            DownloadEvent::Paused => self.with_child(record, |child, _| {
                child.bar.set_position(Self::position(record));
                child.bar.set_message(format!("{} (paused)", label));
            }),
            DownloadEvent::FinishedSuccess => self.with_child(record, |child, main| {
                child.bar.set_position(SCALE);
                self.finish_child(child, main, label);
            }),
            DownloadEvent::FinishedError | DownloadEvent::Cancelled => {
                self.with_child(record, |child, main| {
                    let message = format!("{} {}", label, record.state());
                    self.finish_child(child, main, message);
                })
            }
            DownloadEvent::Removed => {
                let mut bars = self.bars();
                bars.removed.insert(record.id());
                let Some(child) = bars.children.remove(&record.id()) else {
                    return;
                };
                drop(bars);
                if !child.finished {
                    let length = self.main.length().unwrap_or(0);
                    self.main.set_length(length.saturating_sub(1));
                }
                child.bar.finish_and_clear();
                self.multi.remove(&child.bar);
            }
        }
    }
}
