#![allow(dead_code)]

use async_trait::async_trait;
use haul::{
    DownloadEvent, DownloadId, DownloadManager, DownloadManagerBuilder, DownloadRecord, Error,
    Metadata, Notification, Observer, ResumeData, Result, Transfer, TransferClient, TransferError,
    TransferEvent, TransferHandle,
};
use reqwest::Url;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Common test constants
pub const TEST_URL: &str = "https://example.com/a.zip";
pub const TEST_DESTINATION: &str = "/tmp/haul-tests";
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Installs a tracing subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a test URL for download testing
pub fn create_test_url(filename: &str) -> Url {
    Url::parse(&format!("https://example.com/{}", filename)).expect("Invalid test url")
}

/// Creates test file content of specified size
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Lets spawned tasks run until they are blocked again.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Polls `condition` until it holds, panicking after [`WAIT_TIMEOUT`].
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `future`, panicking after [`WAIT_TIMEOUT`].
pub async fn within<T>(what: &str, future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT_TIMEOUT, future)
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {}", what))
}

/// Waits until the record reaches a state matching `predicate`.
pub async fn wait_for_record(
    manager: &DownloadManager,
    id: DownloadId,
    predicate: impl Fn(&DownloadRecord) -> bool,
) -> DownloadRecord {
    eventually("record state", || {
        manager.get(id).map(|record| predicate(&record)).unwrap_or(false)
    })
    .await;
    manager.get(id).expect("Record disappeared")
}

// === Fake Transfer Client ===

/// Handle recording the commands the manager sends to a transfer.
#[derive(Debug, Default)]
pub struct FakeHandle {
    suspended: AtomicBool,
    cancelled: AtomicBool,
    pub suspend_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
}

impl FakeHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl TransferHandle for FakeHandle {
    fn suspend(&self) {
        self.suspend_calls.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }
}

/// A transfer opened by the [`FakeTransferClient`], driven by the test.
pub struct OpenedTransfer {
    pub url: Option<Url>,
    pub filename: Option<String>,
    pub resume_data: Option<ResumeData>,
    pub destination: PathBuf,
    pub handle: Arc<FakeHandle>,
    events: Option<mpsc::UnboundedSender<TransferEvent>>,
}

impl OpenedTransfer {
    fn send(&self, event: TransferEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    pub fn progress(&self, fraction: f64) {
        self.send(TransferEvent::Progress(fraction));
    }

    pub fn succeed(&self) {
        self.send(TransferEvent::Finished(Ok(())));
    }

    pub fn fail(&self, reason: &str) {
        self.send(TransferEvent::Finished(Err(TransferError::new(reason))));
    }

    pub fn fail_with_resume_data(&self, reason: &str, resume_data: ResumeData) {
        self.send(TransferEvent::Finished(Err(
            TransferError::new(reason).with_resume_data(resume_data)
        )));
    }

    /// Drops the event sender without a terminal event.
    pub fn vanish(&mut self) {
        self.events = None;
    }
}

/// In-memory [`TransferClient`] whose transfers are driven by the test.
pub struct FakeTransferClient {
    metadata: Mutex<HashMap<String, Metadata>>,
    metadata_failure: Option<String>,
    open_failure: Option<String>,
    resume_failure: Option<String>,
    metadata_gate: Option<Arc<Semaphore>>,
    open_gate: Option<Arc<Semaphore>>,
    opened: mpsc::UnboundedSender<OpenedTransfer>,
    pub metadata_calls: AtomicUsize,
    pub open_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
}

impl FakeTransferClient {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OpenedTransfer>) {
        let (opened, receiver) = mpsc::unbounded_channel();
        let client = Self {
            metadata: Mutex::new(HashMap::new()),
            metadata_failure: None,
            open_failure: None,
            resume_failure: None,
            metadata_gate: None,
            open_gate: None,
            opened,
            metadata_calls: AtomicUsize::new(0),
            open_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
        };
        (client, receiver)
    }

    pub fn with_metadata(self, url: &Url, metadata: Metadata) -> Self {
        self.metadata
            .lock()
            .unwrap()
            .insert(url.to_string(), metadata);
        self
    }

    pub fn failing_metadata(mut self, reason: &str) -> Self {
        self.metadata_failure = Some(reason.to_string());
        self
    }

    pub fn failing_open(mut self, reason: &str) -> Self {
        self.open_failure = Some(reason.to_string());
        self
    }

    pub fn failing_resume(mut self, reason: &str) -> Self {
        self.resume_failure = Some(reason.to_string());
        self
    }

    /// Holds every metadata resolution until a permit is added to the gate.
    pub fn gate_metadata(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.metadata_gate = Some(gate.clone());
        (self, gate)
    }

    /// Holds every open and reopen until a permit is added to the gate.
    pub fn gate_open(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.open_gate = Some(gate.clone());
        (self, gate)
    }

    async fn pass(gate: &Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            gate.acquire().await.expect("Gate closed").forget();
        }
    }

    fn open(
        &self,
        url: Option<Url>,
        filename: Option<String>,
        resume_data: Option<ResumeData>,
        destination: &Path,
    ) -> Transfer {
        let handle = Arc::new(FakeHandle::default());
        let (events, receiver) = mpsc::unbounded_channel();
        let _ = self.opened.send(OpenedTransfer {
            url,
            filename,
            resume_data,
            destination: destination.to_path_buf(),
            handle: handle.clone(),
            events: Some(events),
        });
        Transfer::new(handle, receiver)
    }
}

#[async_trait]
impl TransferClient for FakeTransferClient {
    async fn resolve_metadata(&self, url: &Url) -> Result<Metadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.metadata_gate).await;
        if let Some(reason) = &self.metadata_failure {
            return Err(Error::MetadataResolutionFailed(reason.clone()));
        }
        let known = self.metadata.lock().unwrap().get(url.as_str()).cloned();
        Ok(known.unwrap_or_else(|| Metadata {
            filename: haul::filename_from_url(url),
            content_type: Some("application/octet-stream".to_string()),
        }))
    }

    async fn open_transfer(
        &self,
        url: &Url,
        destination: &Path,
        filename: Option<&str>,
    ) -> Result<Transfer> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.open_gate).await;
        if let Some(reason) = &self.open_failure {
            return Err(Error::TransferOpenFailed(reason.clone()));
        }
        Ok(self.open(
            Some(url.clone()),
            filename.map(String::from),
            None,
            destination,
        ))
    }

    async fn resume_transfer(
        &self,
        resume_data: ResumeData,
        destination: &Path,
    ) -> Result<Transfer> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        Self::pass(&self.open_gate).await;
        if let Some(reason) = &self.resume_failure {
            return Err(Error::TransferOpenFailed(reason.clone()));
        }
        Ok(self.open(None, None, Some(resume_data), destination))
    }
}

/// Waits for the next transfer the fake client opens.
pub async fn next_transfer(opened: &mut mpsc::UnboundedReceiver<OpenedTransfer>) -> OpenedTransfer {
    within("an opened transfer", opened.recv())
        .await
        .expect("Fake client dropped")
}

// === Observers ===

/// Observer keeping every notification it receives.
#[derive(Default)]
pub struct RecordingObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl Observer for RecordingObserver {
    fn notify(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}

impl RecordingObserver {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Events received for one download, in order.
    pub fn events_for(&self, id: DownloadId) -> Vec<DownloadEvent> {
        self.notifications()
            .iter()
            .filter(|notification| notification.record().id() == id)
            .map(|notification| notification.event())
            .collect()
    }

    pub fn count(&self, id: DownloadId, event: DownloadEvent) -> usize {
        self.events_for(id)
            .into_iter()
            .filter(|candidate| *candidate == event)
            .count()
    }

    /// Waits for the first `event` notification about `id`.
    pub async fn wait_for(&self, id: DownloadId, event: DownloadEvent) -> Notification {
        eventually(&format!("{} event", event), || self.count(id, event) > 0).await;
        self.notifications()
            .into_iter()
            .find(|notification| notification.record().id() == id && notification.event() == event)
            .expect("Notification vanished")
    }
}

/// Observer that panics on every notification.
pub struct PanickingObserver;

impl Observer for PanickingObserver {
    fn notify(&self, _notification: &Notification) {
        panic!("observer failure");
    }
}

// === Manager Helpers ===

/// Builds a manager driven by a fresh fake client and recording observer.
pub fn create_test_manager(
    client: FakeTransferClient,
) -> (DownloadManager, Arc<FakeTransferClient>, Arc<RecordingObserver>) {
    let client = Arc::new(client);
    let observer = Arc::new(RecordingObserver::default());
    let manager = DownloadManagerBuilder::new()
        .client(client.clone())
        .observer(&observer)
        .build()
        .expect("Failed to build manager");
    (manager, client, observer)
}

/// Starts a download and waits for its transfer to be opened and attached.
pub async fn start_downloading(
    manager: &DownloadManager,
    opened: &mut mpsc::UnboundedReceiver<OpenedTransfer>,
    url: Url,
) -> (DownloadId, OpenedTransfer) {
    let id = manager.start(url, TEST_DESTINATION);
    let transfer = next_transfer(opened).await;
    wait_for_record(manager, id, |record| record.state().is_downloading()).await;
    (id, transfer)
}

// === Mock HTTP Server ===

/// Starts a mock server serving `body` as `filename` on every path but
/// `/missing`, which answers 404.
///
/// `HEAD` answers with the headers only. Range requests are answered by
/// [`mount_range`].
pub async fn serve_bytes(body: Vec<u8>, filename: &str) -> MockServer {
    let server = MockServer::start().await;
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-type", "application/octet-stream")
                .insert_header("content-disposition", disposition.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-disposition", disposition.as_str())
                .set_body_raw(body, "application/octet-stream"),
        )
        .mount(&server)
        .await;
    server
}

/// Answers `GET` requests for `bytes=<offset>-` with the rest of `body`.
pub async fn mount_range(server: &MockServer, body: &[u8], offset: usize) {
    let content_range = format!("bytes {}-{}/{}", offset, body.len() - 1, body.len());
    Mock::given(method("GET"))
        .and(header("range", format!("bytes={}-", offset).as_str()))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("accept-ranges", "bytes")
                .insert_header("content-range", content_range.as_str())
                .set_body_raw(body[offset..].to_vec(), "application/octet-stream"),
        )
        .with_priority(2)
        .mount(server)
        .await;
}

/// URL of `path` on the mock server.
pub fn mock_url(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), path)).expect("Invalid mock url")
}
