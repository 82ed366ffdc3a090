//! Configuration structures and defaults for the download manager.

use crate::http::{HttpClientConfig, DEFAULT_SUSPEND_TIMEOUT};

use reqwest::header::HeaderMap;
use std::time::Duration;

/// Configuration structure for the download manager.
///
/// These settings shape the default [`HttpTransferClient`]; they are ignored
/// when a custom client is given to the builder.
///
/// [`HttpTransferClient`]: crate::http::HttpTransferClient
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Number of retries for transient HTTP failures.
    pub retries: u32,
    /// Optional proxy configuration.
    pub proxy: Option<reqwest::Proxy>,
    /// Custom HTTP headers.
    pub headers: Option<HeaderMap>,
    /// How long a paused HTTP transfer keeps its connection open.
    pub suspend_timeout: Duration,
}

impl ManagerConfig {
    /// HTTP client settings derived from this configuration.
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            retries: self.retries,
            proxy: self.proxy.clone(),
            headers: self.headers.clone(),
            suspend_timeout: self.suspend_timeout,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            proxy: None,
            headers: None,
            suspend_timeout: DEFAULT_SUSPEND_TIMEOUT,
        }
    }
}
