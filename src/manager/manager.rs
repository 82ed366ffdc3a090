//! Download lifecycle orchestration.
//!
//! The [`DownloadManager`] owns the [`Registry`] and drives every record
//! through the [`TransferClient`]. Work that waits on the network runs in
//! spawned tokio tasks; each of them re-resolves its record by id after every
//! `.await`, so a record removed or cancelled in the meantime is simply
//! skipped and a handle obtained for it is cancelled instead of leaked.
//!
//! # Examples
//!
//! ```rust,no_run
//! use haul::manager::DownloadManagerBuilder;
//! use reqwest::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = DownloadManagerBuilder::new().build()?;
//! let id = manager.start(Url::parse("https://example.com/a.zip")?, "downloads");
//!
//! manager.pause(id)?;
//! manager.resume(id)?;
//!
//! for record in manager.list() {
//!     println!("{} {}", record.label(), record.state());
//! }
//! # Ok(())
//! # }
//! ```

use super::config::ManagerConfig;
use crate::download::record::{FinishAction, ResumeAction};
use crate::download::{DownloadId, DownloadRecord};
use crate::error::{Error, Result};
use crate::observer::{DownloadEvent, Notification, Observer};
use crate::registry::Registry;
use crate::transfer::{
    ResumeData, Transfer, TransferClient, TransferError, TransferEvent, TransferEvents,
};

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Url;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Manages a queue of downloads.
///
/// Cloning is cheap: clones share the same registry, client and observer.
/// Methods that spawn work ([`start`], [`resume`], [`retry`]) must be called
/// from within a tokio runtime.
///
/// [`start`]: DownloadManager::start
/// [`resume`]: DownloadManager::resume
/// [`retry`]: DownloadManager::retry
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ManagerConfig,
    registry: Registry,
    client: Arc<dyn TransferClient>,
    observer: Option<Weak<dyn Observer>>,
}

impl fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadManager")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("observer", &self.inner.observer.is_some())
            .finish()
    }
}

impl DownloadManager {
    /// Creates a new manager. Use [`DownloadManagerBuilder`] instead.
    ///
    /// [`DownloadManagerBuilder`]: super::DownloadManagerBuilder
    pub(crate) fn new(
        config: ManagerConfig,
        client: Arc<dyn TransferClient>,
        observer: Option<Weak<dyn Observer>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Registry::new(),
                client,
                observer,
            }),
        }
    }

    /// Gets the number of retries for transient HTTP failures.
    ///
    /// This is the configured value. It only takes effect on the default
    /// [`HttpTransferClient`](crate::http::HttpTransferClient); a client given
    /// to [`DownloadManagerBuilder::client`] ignores it.
    ///
    /// [`DownloadManagerBuilder::client`]: super::DownloadManagerBuilder::client
    pub fn retries(&self) -> u32 {
        self.inner.config.retries
    }

    /// Gets the custom headers.
    ///
    /// Like [`retries`](Self::retries), only the default client sends them.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.inner.config.headers.as_ref()
    }

    /// Starts downloading `url` into the `destination` folder.
    ///
    /// Returns immediately with the new record's id; metadata resolution and
    /// the transfer itself happen in the background.
    pub fn start(&self, url: Url, destination: impl Into<PathBuf>) -> DownloadId {
        let destination = destination.into();
        let id = loop {
            let record = DownloadRecord::new(url.clone(), destination.clone());
            let id = record.id();
            match self.inner.registry.insert(record) {
                Ok(_) => break id,
                Err(e) => warn!(%id, "{}, generating a new identity", e),
            }
        };
        info!(%id, %url, "Queued download");

        tokio::spawn(self.inner.clone().run(id));
        id
    }

    /// Pauses a downloading record, keeping its transfer alive.
    ///
    /// Unknown ids and records that are not downloading are left untouched.
    pub fn pause(&self, id: DownloadId) -> Result<()> {
        let paused = self
            .inner
            .registry
            .update_with_position(id, |record| record.pause().then(|| record.clone()));
        match paused {
            Some((position, Some(snapshot))) => {
                info!(%id, "Paused download");
                self.inner.emit(DownloadEvent::Paused, position, snapshot);
            }
            Some((_, None)) => debug!(%id, "Download is not downloading, pause ignored"),
            None => debug!(%id, "Download not found, pause ignored"),
        }
        Ok(())
    }

    /// Resumes a paused record.
    ///
    /// A record whose transfer is still alive is resumed in place. Otherwise
    /// the transfer is reopened in the background from the record's saved
    /// resume data.
    ///
    /// # Errors
    ///
    /// [`Error::ResumeImpossible`] if the record has neither a live transfer
    /// nor resume data. Its state is left unchanged.
    pub fn resume(&self, id: DownloadId) -> Result<()> {
        let resumed = self
            .inner
            .registry
            .update_with_position(id, |record| {
                record.resume().map(|action| (action, record.clone()))
            });
        let Some((position, outcome)) = resumed else {
            debug!(%id, "Download not found, resume ignored");
            return Ok(());
        };

        match outcome? {
            (ResumeAction::InPlace, snapshot) => {
                info!(%id, "Resumed download");
                self.inner.emit(DownloadEvent::Resumed, position, snapshot);
            }
            (
                ResumeAction::Reopen {
                    resume_data,
                    generation,
                },
                _,
            ) => {
                info!(%id, "Reopening download from resume data");
                tokio::spawn(self.inner.clone().reopen(id, generation, resume_data));
            }
            (ResumeAction::Ignored, _) => debug!(%id, "Download is not paused, resume ignored"),
        }
        Ok(())
    }

    /// Cancels a record and its transfer.
    ///
    /// The record moves to the terminal `Cancelled` state right away; the
    /// transport's own failure report for the aborted transfer is discarded.
    pub fn cancel(&self, id: DownloadId) -> Result<()> {
        let cancelled = self
            .inner
            .registry
            .update_with_position(id, |record| record.cancel(Utc::now()).then(|| record.clone()));
        match cancelled {
            Some((position, Some(snapshot))) => {
                info!(%id, "Cancelled download");
                self.inner.emit(DownloadEvent::Cancelled, position, snapshot);
            }
            Some((_, None)) => debug!(%id, "Download already finished, cancel ignored"),
            None => debug!(%id, "Download not found, cancel ignored"),
        }
        Ok(())
    }

    /// Removes a record, cancelling its transfer if one is live.
    ///
    /// Callbacks still in flight for this id find nothing and do nothing.
    pub fn remove(&self, id: DownloadId) -> Result<()> {
        let Some((position, mut record)) = self.inner.registry.remove(id) else {
            debug!(%id, "Download not found, remove ignored");
            return Ok(());
        };
        if let Some(handle) = record.detach() {
            handle.cancel();
        }
        info!(%id, "Removed download");
        self.inner.emit(DownloadEvent::Removed, position, record);
        Ok(())
    }

    /// Starts a new download for the url and destination of a failed or
    /// cancelled record. The old record is left as it is.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] if the id is unknown, [`Error::NotRetryable`]
    /// if the record is not failed or cancelled.
    pub fn retry(&self, id: DownloadId) -> Result<DownloadId> {
        let record = self
            .inner
            .registry
            .lookup(id)
            .ok_or(Error::RecordNotFound(id))?;
        if !record.state().is_retryable() {
            return Err(Error::NotRetryable(id));
        }
        debug!(%id, "Retrying download");
        Ok(self.start(record.url().clone(), record.destination()))
    }

    /// Registers a paused download that can be resumed from `resume_data`,
    /// for example one saved before the process restarted.
    pub fn restore(
        &self,
        url: Url,
        destination: impl Into<PathBuf>,
        resume_data: ResumeData,
    ) -> Result<DownloadId> {
        let record = DownloadRecord::restored(url, destination.into(), resume_data);
        let id = record.id();
        self.inner.registry.insert(record)?;
        info!(%id, "Restored paused download");
        Ok(id)
    }

    /// Ordered snapshots of every managed record.
    pub fn list(&self) -> Vec<DownloadRecord> {
        self.inner.registry.snapshot()
    }

    /// Snapshot of one record.
    pub fn get(&self, id: DownloadId) -> Option<DownloadRecord> {
        self.inner.registry.lookup(id)
    }

    /// Snapshot of the record currently at `position` in [`list`](Self::list).
    pub fn get_by_position(&self, position: usize) -> Option<DownloadRecord> {
        self.inner.registry.lookup_by_position(position)
    }

    /// Current position of the record in [`list`](Self::list).
    pub fn position(&self, id: DownloadId) -> Option<usize> {
        self.inner.registry.position(id)
    }

    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }
}

impl Inner {
    /// Resolves metadata, opens the transfer and follows it to the end.
    async fn run(self: Arc<Self>, id: DownloadId) {
        let Some(url) = self.registry.lookup(id).map(|record| record.url().clone()) else {
            debug!(%id, "Download removed before it started");
            return;
        };

        debug!(%id, %url, "Resolving metadata");
        match self.client.resolve_metadata(&url).await {
            Ok(metadata) => {
                if self
                    .registry
                    .update(id, |record| record.apply_metadata(metadata))
                    .is_none()
                {
                    debug!(%id, "Download removed while resolving metadata");
                    return;
                }
            }
            Err(e) => warn!(%id, error = %e, "Continuing without metadata"),
        }

        let waiting = self
            .registry
            .lookup(id)
            .filter(|record| record.state().is_pending());
        let Some(record) = waiting else {
            debug!(%id, "Download no longer pending, not opening a transfer");
            return;
        };
        let generation = record.generation();

        debug!(%id, "Opening transfer");
        let opened = self
            .client
            .open_transfer(&url, record.destination(), record.filename())
            .await;
        self.follow(id, generation, opened).await;
    }

    /// Reopens a paused record from its resume data and follows the new transfer.
    async fn reopen(self: Arc<Self>, id: DownloadId, generation: u64, resume_data: ResumeData) {
        let Some(destination) = self
            .registry
            .lookup(id)
            .map(|record| record.destination().to_path_buf())
        else {
            debug!(%id, "Download removed before it could be reopened");
            return;
        };
        let reopened = self.client.resume_transfer(resume_data, &destination).await;
        self.follow(id, generation, reopened).await;
    }

    /// Attaches an opened transfer to its record and pumps its events.
    async fn follow(self: &Arc<Self>, id: DownloadId, generation: u64, opened: Result<Transfer>) {
        let transfer = match opened {
            Ok(transfer) => transfer,
            Err(e) => {
                self.fail_to_open(id, generation, e);
                return;
            }
        };

        let Transfer { handle, events } = transfer;
        let attached = self.registry.update_with_position(id, |record| {
            record
                .attach(generation, handle.clone(), Utc::now())
                .map(|event| (event, record.clone()))
        });
        match attached {
            Some((position, Some((event, snapshot)))) => {
                info!(%id, "Transfer {}", event);
                self.emit(event, position, snapshot);
                self.pump(id, generation, events).await;
            }
            _ => {
                debug!(%id, "Download no longer waiting for this transfer, cancelling it");
                handle.cancel();
            }
        }
    }

    fn fail_to_open(&self, id: DownloadId, generation: u64, error: Error) {
        let reason = error.to_string();
        let failed = self.registry.update_with_position(id, |record| {
            record
                .fail_to_open(generation, reason, Utc::now())
                .then(|| record.clone())
        });
        match failed {
            Some((position, Some(snapshot))) => {
                warn!(%id, error = %error, "Transfer could not be opened");
                self.emit(DownloadEvent::FinishedError, position, snapshot);
            }
            _ => debug!(%id, error = %error, "Ignoring open failure of a stale transfer"),
        }
    }

    /// Applies transfer events until the terminal one.
    async fn pump(self: &Arc<Self>, id: DownloadId, generation: u64, mut events: TransferEvents) {
        while let Some(event) = events.recv().await {
            match event {
                TransferEvent::Progress(fraction) => self.on_progress(id, generation, fraction),
                TransferEvent::Finished(result) => {
                    self.on_finished(id, generation, result);
                    return;
                }
            }
        }
        self.on_finished(
            id,
            generation,
            Err(TransferError::new("transfer ended without a result")),
        );
    }

    fn on_progress(&self, id: DownloadId, generation: u64, fraction: f64) {
        let applied = self.registry.update_with_position(id, |record| {
            record
                .apply_progress(generation, fraction)
                .then(|| record.clone())
        });
        if let Some((position, Some(snapshot))) = applied {
            self.emit(DownloadEvent::Progress, position, snapshot);
        }
    }

    fn on_finished(
        self: &Arc<Self>,
        id: DownloadId,
        generation: u64,
        result: std::result::Result<(), TransferError>,
    ) {
        let finished = self.registry.update_with_position(id, |record| {
            let action = record.finish(generation, result, Utc::now());
            (action, record.clone())
        });
        let Some((position, (action, snapshot))) = finished else {
            debug!(%id, "Download removed, ignoring transfer result");
            return;
        };
        match action {
            FinishAction::Notify(event) => {
                match snapshot.failure() {
                    Some(error) => warn!(%id, %error, "Download failed"),
                    None => info!(%id, "Download completed"),
                }
                self.emit(event, position, snapshot);
            }
            FinishAction::Reopen {
                resume_data,
                generation,
            } => {
                info!(%id, "Reopening download from resume data");
                tokio::spawn(self.clone().reopen(id, generation, resume_data));
            }
            FinishAction::Ignored => debug!(%id, "Transfer result left the download unchanged"),
        }
    }

    /// Delivers a notification, unless the observer is gone.
    fn emit(&self, event: DownloadEvent, position: usize, record: DownloadRecord) {
        let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        let notification = Notification::new(event, position, record);
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(&notification)));
        if delivered.is_err() {
            warn!(
                id = %notification.record().id(),
                %event,
                "Observer panicked while handling a notification"
            );
        }
    }
}
