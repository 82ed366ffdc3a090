//! The managed download record and its state machine.
//!
//! A [`DownloadRecord`] is only ever mutated by the
//! [`DownloadManager`](crate::manager::DownloadManager), through the
//! registry's atomic per-id updates. The transition methods below are the
//! only way its state changes; each one re-checks the transfer generation so
//! that events from a handle the record no longer trusts are discarded.

use super::state::DownloadState;
use crate::error::{Error, Result};
use crate::observer::DownloadEvent;
use crate::transfer::{Metadata, ResumeData, TransferError, TransferHandle};

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Stable identity of a managed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadId(Uuid);

impl DownloadId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a resume request turned into.
#[derive(Debug)]
pub(crate) enum ResumeAction {
    /// Not paused, or a reopen is already in flight.
    Ignored,
    /// The retained handle was resumed.
    InPlace,
    /// The transfer must be reopened from saved resume data.
    Reopen {
        resume_data: ResumeData,
        generation: u64,
    },
}

/// What a terminal transfer result turned into.
#[derive(Debug, PartialEq)]
pub(crate) enum FinishAction {
    /// Stale or absorbed result; nothing to report.
    Ignored,
    /// The record finished; the event must be delivered.
    Notify(DownloadEvent),
    /// A transfer resumed in place was already dead; it must be reopened
    /// from the resume data it left behind.
    Reopen {
        resume_data: ResumeData,
        generation: u64,
    },
}

/// Represents one managed transfer.
///
/// Records handed out by the manager are snapshots; they do not change after
/// the call that returned them.
#[derive(Clone)]
pub struct DownloadRecord {
    id: DownloadId,
    url: Url,
    destination: PathBuf,
    filename: Option<String>,
    content_type: Option<String>,
    state: DownloadState,
    progress: f64,
    temporary_progress: Option<f64>,
    resume_data: Option<ResumeData>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    transfer: Option<Arc<dyn TransferHandle>>,
    generation: u64,
    reopening: bool,
    resumed_in_place: bool,
    revision: u64,
}

impl DownloadRecord {
    /// Creates a pending record with a fresh identity.
    pub(crate) fn new(url: Url, destination: PathBuf) -> Self {
        Self {
            id: DownloadId::new(),
            url,
            destination,
            filename: None,
            content_type: None,
            state: DownloadState::Pending,
            progress: 0.0,
            temporary_progress: None,
            resume_data: None,
            started_at: None,
            ended_at: None,
            transfer: None,
            generation: 0,
            reopening: false,
            resumed_in_place: false,
            revision: 0,
        }
    }

    /// Creates a paused record that can only be resumed from `resume_data`.
    /// Empty resume data is dropped.
    pub(crate) fn restored(url: Url, destination: PathBuf, resume_data: ResumeData) -> Self {
        Self {
            state: DownloadState::Paused,
            resume_data: Some(resume_data).filter(|data| !data.is_empty()),
            ..Self::new(url, destination)
        }
    }

    pub fn id(&self) -> DownloadId {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Folder the file is downloaded into.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Filename resolved from the transfer client's metadata, once known.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn state(&self) -> &DownloadState {
        &self.state
    }

    /// Last authoritative progress fraction, kept while paused.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Progress shown while waiting for the first event of a resumed transfer.
    pub fn temporary_progress(&self) -> Option<f64> {
        self.temporary_progress
    }

    pub fn resume_data(&self) -> Option<&ResumeData> {
        self.resume_data.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// The failure of a failed download, as an [`Error::TransferFailed`].
    pub fn failure(&self) -> Option<Error> {
        self.state
            .failure_reason()
            .map(|reason| Error::TransferFailed(reason.to_owned()))
    }

    /// Whether the manager currently owns a live transfer handle for this record.
    pub fn has_active_transfer(&self) -> bool {
        self.transfer.is_some()
    }

    /// Name to show for this download: its filename, or the URL.
    pub fn label(&self) -> String {
        match &self.filename {
            Some(filename) => filename.clone(),
            None => self.url.to_string(),
        }
    }

    /// Counter bumped by every registry update of this record. A snapshot
    /// with a higher revision is newer.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Fills in the fields the transfer client resolved.
    pub(crate) fn apply_metadata(&mut self, metadata: Metadata) {
        if metadata.filename.is_some() {
            self.filename = metadata.filename;
        }
        if metadata.content_type.is_some() {
            self.content_type = metadata.content_type;
        }
    }

    /// Takes ownership of a newly opened transfer.
    ///
    /// Returns `None` when the record stopped waiting for this transfer (it
    /// was cancelled, or a newer generation exists); the caller must then
    /// cancel the handle.
    pub(crate) fn attach(
        &mut self,
        generation: u64,
        handle: Arc<dyn TransferHandle>,
        now: DateTime<Utc>,
    ) -> Option<DownloadEvent> {
        if generation != self.generation {
            return None;
        }
        let event = match self.state {
            DownloadState::Pending => {
                self.started_at = Some(now);
                self.progress = 0.0;
                self.state = DownloadState::Downloading { progress: 0.0 };
                DownloadEvent::Started
            }
            DownloadState::Paused if self.reopening => {
                self.reopening = false;
                self.started_at.get_or_insert(now);
                self.temporary_progress = Some(self.progress);
                self.state = DownloadState::Downloading {
                    progress: self.progress,
                };
                DownloadEvent::Resumed
            }
            // Resumed already reported when the dead transfer was resumed in place.
            DownloadState::Downloading { .. } if self.reopening => {
                self.reopening = false;
                DownloadEvent::Progress
            }
            _ => return None,
        };
        self.resumed_in_place = false;
        self.transfer = Some(handle);
        Some(event)
    }

    /// Records that the transfer this record was waiting for could not be opened.
    pub(crate) fn fail_to_open(
        &mut self,
        generation: u64,
        reason: String,
        now: DateTime<Utc>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        let waiting = match self.state {
            DownloadState::Pending => true,
            DownloadState::Paused | DownloadState::Downloading { .. } => self.reopening,
            _ => false,
        };
        if !waiting {
            return false;
        }
        self.reopening = false;
        self.state = DownloadState::Failed(reason);
        self.ended_at = Some(now);
        true
    }

    /// Applies a progress event. Returns whether the state changed.
    pub(crate) fn apply_progress(&mut self, generation: u64, fraction: f64) -> bool {
        if generation != self.generation || !fraction.is_finite() {
            return false;
        }
        let Some(handle) = &self.transfer else {
            return false;
        };
        // A suspended transport can still flush progress it had in flight.
        if handle.is_suspended() || !self.state.is_downloading() {
            return false;
        }
        let progress = fraction.clamp(0.0, 1.0);
        self.resumed_in_place = false;
        self.temporary_progress = None;
        self.progress = progress;
        self.state = DownloadState::Downloading { progress };
        true
    }

    /// Applies the terminal result of the current transfer.
    ///
    /// A failure carrying resume data does not fail the record when the
    /// transfer died while suspended: a paused record keeps the data, and a
    /// record resumed in place before the failure was seen is reopened.
    pub(crate) fn finish(
        &mut self,
        generation: u64,
        result: std::result::Result<(), TransferError>,
        now: DateTime<Utc>,
    ) -> FinishAction {
        if generation != self.generation || self.transfer.is_none() {
            return FinishAction::Ignored;
        }
        self.transfer = None;
        let resumed_in_place = std::mem::take(&mut self.resumed_in_place);
        match result {
            Ok(()) => {
                self.resume_data = None;
                self.temporary_progress = None;
                self.progress = 1.0;
                self.state = DownloadState::Completed;
                self.ended_at = Some(now);
                FinishAction::Notify(DownloadEvent::FinishedSuccess)
            }
            Err(error) if self.state.is_paused() && error.resume_data().is_some() => {
                debug!(
                    id = %self.id,
                    reason = error.reason(),
                    "Suspended transfer ended, keeping its resume data"
                );
                self.resume_data = error.into_resume_data();
                FinishAction::Ignored
            }
            Err(error) if resumed_in_place && self.state.is_downloading() => {
                let reason = error.reason().to_owned();
                match error.into_resume_data() {
                    Some(resume_data) => {
                        debug!(id = %self.id, "Resumed transfer was already gone, reopening it");
                        self.generation += 1;
                        self.reopening = true;
                        FinishAction::Reopen {
                            resume_data,
                            generation: self.generation,
                        }
                    }
                    None => self.fail(reason, now),
                }
            }
            Err(error) => self.fail(error.reason().to_owned(), now),
        }
    }

    fn fail(&mut self, reason: String, now: DateTime<Utc>) -> FinishAction {
        self.temporary_progress = None;
        self.state = DownloadState::Failed(reason);
        self.ended_at = Some(now);
        FinishAction::Notify(DownloadEvent::FinishedError)
    }

    /// Suspends a downloading record, keeping its handle.
    pub(crate) fn pause(&mut self) -> bool {
        let Some(handle) = self.transfer.as_ref() else {
            return false;
        };
        if !self.state.is_downloading() {
            return false;
        }
        handle.suspend();
        self.resumed_in_place = false;
        self.temporary_progress = None;
        self.state = DownloadState::Paused;
        true
    }

    /// Resumes a paused record, or tells the caller to reopen it.
    pub(crate) fn resume(&mut self) -> Result<ResumeAction> {
        if !self.state.is_paused() || self.reopening {
            return Ok(ResumeAction::Ignored);
        }
        if let Some(handle) = &self.transfer {
            handle.resume();
            self.resumed_in_place = true;
            self.temporary_progress = Some(self.progress);
            self.state = DownloadState::Downloading {
                progress: self.progress,
            };
            return Ok(ResumeAction::InPlace);
        }
        match self.resume_data.take() {
            Some(resume_data) => {
                self.generation += 1;
                self.reopening = true;
                Ok(ResumeAction::Reopen {
                    resume_data,
                    generation: self.generation,
                })
            }
            None => Err(Error::ResumeImpossible(self.id)),
        }
    }

    /// Cancels a non-terminal record and its transfer.
    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if let Some(handle) = self.transfer.take() {
            handle.cancel();
        }
        self.generation += 1;
        self.reopening = false;
        self.resumed_in_place = false;
        self.temporary_progress = None;
        self.resume_data = None;
        self.state = DownloadState::Cancelled;
        self.ended_at = Some(now);
        true
    }

    /// Gives up ownership of the live handle, if any.
    pub(crate) fn detach(&mut self) -> Option<Arc<dyn TransferHandle>> {
        self.generation += 1;
        self.transfer.take()
    }
}

impl fmt::Debug for DownloadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRecord")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("destination", &self.destination)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("state", &self.state)
            .field("progress", &self.progress)
            .field("temporary_progress", &self.temporary_progress)
            .field("resume_data", &self.resume_data)
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .field("active_transfer", &self.transfer.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}
