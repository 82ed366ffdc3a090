//! The default [`TransferClient`], streaming HTTP(S) bodies to disk.
//!
//! Metadata comes from a `HEAD` request: the filename from
//! `Content-Disposition`, falling back to the last segment of the URL, and the
//! MIME type from `Content-Type`. A transfer is a `GET` request whose body is
//! written chunk by chunk into `<destination>/<filename>` by a spawned task.
//!
//! When a transfer is interrupted and the server accepts range requests, its
//! terminal error carries [`ResumeData`]: the JSON encoding of an
//! [`HttpResumeData`]. Reopening it sends `Range: bytes=<offset>-` and appends
//! to the partial file.

use super::client::{create_http_client, HttpClientConfig};
use crate::error::{Error, Result};
use crate::transfer::{
    Metadata, ResumeData, Transfer, TransferClient, TransferError, TransferEvent, TransferHandle,
};
use crate::utils::{
    filename_from_content_disposition, filename_from_url, progress_fraction, total_length,
};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_TYPE, RANGE};
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Resume state of an interrupted HTTP transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResumeData {
    /// URL being downloaded.
    pub url: String,
    /// File the body was being written to.
    pub path: PathBuf,
    /// Number of bytes already on disk.
    pub offset: u64,
}

impl HttpResumeData {
    /// Encodes the state as opaque [`ResumeData`].
    pub fn to_resume_data(&self) -> Result<ResumeData> {
        serde_json::to_vec(self)
            .map(ResumeData::from)
            .map_err(|e| Error::InvalidResumeData(e.to_string()))
    }

    /// Decodes resume data produced by [`HttpTransferClient`].
    pub fn from_resume_data(resume_data: &ResumeData) -> Result<Self> {
        serde_json::from_slice(resume_data.as_bytes())
            .map_err(|e| Error::InvalidResumeData(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Running,
    Suspended,
    Cancelled,
}

/// Handle of a transfer run by [`HttpTransferClient`].
#[derive(Debug)]
struct HttpTransferHandle {
    control: watch::Sender<Control>,
}

impl HttpTransferHandle {
    fn switch(&self, from: Control, to: Control) {
        self.control.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });
    }
}

impl TransferHandle for HttpTransferHandle {
    fn suspend(&self) {
        self.switch(Control::Running, Control::Suspended);
    }

    fn resume(&self) {
        self.switch(Control::Suspended, Control::Running);
    }

    fn cancel(&self) {
        self.control.send_replace(Control::Cancelled);
    }

    fn is_suspended(&self) -> bool {
        *self.control.borrow() == Control::Suspended
    }
}

/// [`TransferClient`] for HTTP(S) URLs.
///
/// ```rust
/// use haul::http::{HttpClientConfig, HttpTransferClient};
///
/// # fn example() -> Result<(), haul::Error> {
/// let client = HttpTransferClient::new(HttpClientConfig::default())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpTransferClient {
    client: ClientWithMiddleware,
    suspend_timeout: Duration,
}

impl fmt::Debug for HttpTransferClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransferClient")
            .field("suspend_timeout", &self.suspend_timeout)
            .finish_non_exhaustive()
    }
}

/// A `GET` response ready to be streamed to disk.
struct Opened {
    url: Url,
    path: PathBuf,
    response: Response,
    offset: u64,
}

impl HttpTransferClient {
    /// Creates a client with the retry and tracing middlewares.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let suspend_timeout = config.suspend_timeout;
        Ok(Self {
            client: create_http_client(config)?,
            suspend_timeout,
        })
    }

    /// Wraps an already configured middleware client.
    pub fn with_client(client: ClientWithMiddleware, suspend_timeout: Duration) -> Self {
        Self {
            client,
            suspend_timeout,
        }
    }

    /// Sends the `GET` request, from `offset` when it is not zero.
    async fn request(&self, url: Url, path: PathBuf, offset: u64) -> Result<Opened> {
        debug!(%url, offset, "Fetching");
        let mut request = self.client.get(url.clone());
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::TransferOpenFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::TransferOpenFailed(e.to_string()))?;

        // A full body means the server ignored the range.
        let offset = if response.status() == StatusCode::PARTIAL_CONTENT {
            offset
        } else {
            0
        };
        Ok(Opened {
            url,
            path,
            response,
            offset,
        })
    }

    /// Prepares the output file and spawns the task streaming the body into it.
    async fn spawn(&self, opened: Opened) -> Result<Transfer> {
        let Opened {
            url,
            path,
            response,
            offset,
        } = opened;

        if let Some(parent) = path.parent() {
            debug!("Creating destination directory {:?}", parent);
            fs::create_dir_all(parent).await?;
        }
        debug!("Creating destination file {:?}", path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(offset > 0)
            .truncate(offset == 0)
            .open(&path)
            .await?;

        let (control, control_rx) = watch::channel(Control::Running);
        let (events, events_rx) = mpsc::unbounded_channel();
        let stream = BodyStream {
            resume: HttpResumeData {
                url: url.to_string(),
                path,
                offset,
            },
            resumable: accepts_ranges(&response),
            total: total_length(&response, offset),
            suspend_timeout: self.suspend_timeout,
            control: control_rx,
            events,
        };
        tokio::spawn(stream.run(response, file));

        Ok(Transfer::new(
            Arc::new(HttpTransferHandle { control }),
            events_rx,
        ))
    }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
    async fn resolve_metadata(&self, url: &Url) -> Result<Metadata> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| Error::MetadataResolutionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::MetadataResolutionFailed(e.to_string()))?;
        let headers = response.headers();

        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .or_else(|| filename_from_url(url));
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|mime| mime.trim().to_string())
            .filter(|mime| !mime.is_empty());

        Ok(Metadata {
            filename,
            content_type,
        })
    }

    async fn open_transfer(
        &self,
        url: &Url,
        destination: &Path,
        filename: Option<&str>,
    ) -> Result<Transfer> {
        let filename = match filename {
            Some(filename) => filename.to_string(),
            None => filename_from_url(url).ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a filename", url))
            })?,
        };
        let opened = self
            .request(url.clone(), destination.join(filename), 0)
            .await?;
        self.spawn(opened).await
    }

    async fn resume_transfer(
        &self,
        resume_data: ResumeData,
        destination: &Path,
    ) -> Result<Transfer> {
        let resume = HttpResumeData::from_resume_data(&resume_data)?;
        let url = Url::parse(&resume.url).map_err(|e| {
            Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", resume.url, e))
        })?;
        let filename = resume.path.file_name().ok_or_else(|| {
            Error::InvalidResumeData(format!("{:?} is not a file path", resume.path))
        })?;
        let path = destination.join(filename);

        // Never ask for more than what actually reached the disk.
        let on_disk = match fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };
        let offset = resume.offset.min(on_disk);

        let opened = self.request(url, path, offset).await?;
        self.spawn(opened).await
    }
}

fn accepts_ranges(response: &Response) -> bool {
    if response.status() == StatusCode::PARTIAL_CONTENT {
        return true;
    }
    match response.headers().get(ACCEPT_RANGES) {
        None => false,
        Some(value) if value == "none" => false,
        Some(_) => true,
    }
}

/// State of the task writing one response body to disk.
struct BodyStream {
    resume: HttpResumeData,
    resumable: bool,
    total: Option<u64>,
    suspend_timeout: Duration,
    control: watch::Receiver<Control>,
    events: mpsc::UnboundedSender<TransferEvent>,
}

impl BodyStream {
    async fn run(mut self, response: Response, mut file: File) {
        let result = self.write_body(response, &mut file).await;
        if let Err(e) = file.flush().await {
            debug!("Failed to flush {:?}: {}", self.resume.path, e);
        }
        debug!(path = ?self.resume.path, ok = result.is_ok(), "Transfer ended");
        let _ = self.events.send(TransferEvent::Finished(result));
    }

    async fn write_body(
        &mut self,
        response: Response,
        file: &mut File,
    ) -> std::result::Result<(), TransferError> {
        let mut stream = response.bytes_stream();
        let mut last_sent = None;

        loop {
            let control = *self.control.borrow_and_update();
            match control {
                Control::Cancelled => return Err(TransferError::new("transfer cancelled")),
                Control::Suspended => {
                    tokio::select! {
                        changed = self.control.changed() => {
                            if changed.is_err() {
                                return Err(TransferError::new("transfer handle dropped"));
                            }
                        }
                        _ = tokio::time::sleep(self.suspend_timeout) => {
                            return Err(self.interrupted("suspended transfer released its connection"));
                        }
                    }
                    continue;
                }
                Control::Running => {}
            }

            tokio::select! {
                changed = self.control.changed() => {
                    if changed.is_err() {
                        return Err(TransferError::new("transfer handle dropped"));
                    }
                }
                item = stream.next() => match item {
                    Some(Ok(mut chunk)) => {
                        let size = chunk.len() as u64;
                        file.write_all_buf(&mut chunk)
                            .await
                            .map_err(TransferError::new)?;
                        self.resume.offset += size;

                        if let Some(fraction) = progress_fraction(self.resume.offset, self.total) {
                            let permille = (fraction * 1000.0) as u32;
                            if last_sent != Some(permille) {
                                last_sent = Some(permille);
                                let _ = self.events.send(TransferEvent::Progress(fraction));
                            }
                        }
                    }
                    Some(Err(e)) => return Err(self.interrupted(e)),
                    None => {
                        return match self.total {
                            Some(total) if self.resume.offset < total => Err(self.interrupted(
                                "connection closed before the transfer completed",
                            )),
                            _ => Ok(()),
                        };
                    }
                },
            }
        }
    }

    /// Failure carrying resume data when the server accepts range requests.
    fn interrupted(&self, reason: impl fmt::Display) -> TransferError {
        let error = TransferError::new(reason);
        if !self.resumable {
            return error;
        }
        match self.resume.to_resume_data() {
            Ok(resume_data) => error.with_resume_data(resume_data),
            Err(_) => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle() -> (HttpTransferHandle, watch::Receiver<Control>) {
        let (control, receiver) = watch::channel(Control::Running);
        (HttpTransferHandle { control }, receiver)
    }

    #[test]
    fn test_resume_data_round_trip() {
        let resume = HttpResumeData {
            url: "https://example.com/a.zip".to_string(),
            path: PathBuf::from("/tmp/downloads/a.zip"),
            offset: 4096,
        };
        let data = resume.to_resume_data().unwrap();
        assert_eq!(HttpResumeData::from_resume_data(&data).unwrap(), resume);
    }

    #[test]
    fn test_garbage_resume_data_is_rejected() {
        let data = ResumeData::new(b"not json".to_vec());
        assert!(matches!(
            HttpResumeData::from_resume_data(&data),
            Err(Error::InvalidResumeData(_))
        ));
    }

    #[test]
    fn test_handle_suspend_resume_cancel() {
        let (handle, receiver) = test_handle();
        assert!(!handle.is_suspended());

        handle.suspend();
        assert!(handle.is_suspended());
        assert_eq!(*receiver.borrow(), Control::Suspended);

        handle.resume();
        assert!(!handle.is_suspended());

        handle.cancel();
        handle.resume();
        assert_eq!(*receiver.borrow(), Control::Cancelled);
    }

    #[test]
    fn test_resume_does_not_revive_cancelled_transfer() {
        let (handle, receiver) = test_handle();
        handle.cancel();
        handle.suspend();
        assert!(!handle.is_suspended());
        assert_eq!(*receiver.borrow(), Control::Cancelled);
    }

    #[tokio::test]
    async fn test_resume_transfer_rejects_invalid_data() {
        let client = HttpTransferClient::new(HttpClientConfig::default()).unwrap();
        let result = client
            .resume_transfer(ResumeData::new(b"{}".to_vec()), Path::new("/tmp"))
            .await;
        assert!(matches!(result, Err(Error::InvalidResumeData(_))));
    }

    #[tokio::test]
    async fn test_open_transfer_without_filename_is_rejected() {
        let client = HttpTransferClient::new(HttpClientConfig::default()).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = client.open_transfer(&url, Path::new("/tmp"), None).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
