//! HTTP client setup and middleware configuration.
//!
//! Every request the [`HttpTransferClient`] sends goes through a
//! `reqwest-middleware` stack:
//!
//! - **Retry Logic**: Exponential backoff retry policy for transient failures
//! - **Tracing**: Request/response spans through `reqwest-tracing`
//! - **Proxy Support**: Optional HTTP/HTTPS proxy configuration
//! - **Custom Headers**: Default headers applied to all requests
//!
//! # Examples
//!
//! ```rust
//! use haul::http::{create_http_client, HttpClientConfig};
//! use reqwest::header::{HeaderMap, USER_AGENT};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut headers = HeaderMap::new();
//! headers.insert(USER_AGENT, "haul/0.1".parse()?);
//!
//! let config = HttpClientConfig {
//!     retries: 5,
//!     headers: Some(headers),
//!     ..HttpClientConfig::default()
//! };
//!
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`HttpTransferClient`]: super::HttpTransferClient

use crate::error::Result;

use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// How long a suspended transfer keeps its connection before releasing it.
pub const DEFAULT_SUSPEND_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Number of retries for failed requests.
    pub retries: u32,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Time after which a suspended transfer gives up its connection and
    /// reports resume data instead.
    pub suspend_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            proxy: None,
            headers: None,
            suspend_timeout: DEFAULT_SUSPEND_TIMEOUT,
        }
    }
}

/// Creates an HTTP client with the retry and tracing middlewares.
///
/// # Example
///
/// ```rust
/// use haul::http::client::{create_http_client, HttpClientConfig};
///
/// let client = create_http_client(HttpClientConfig::default()).unwrap();
/// ```
pub fn create_http_client(config: HttpClientConfig) -> Result<ClientWithMiddleware> {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.retries);

    let mut inner_client_builder = reqwest::Client::builder();
    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }
    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }
    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        // Retry failed requests.
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, USER_AGENT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.retries, 3);
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert_eq!(config.suspend_timeout, DEFAULT_SUSPEND_TIMEOUT);
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            retries: 5,
            headers: Some(headers),
            ..HttpClientConfig::default()
        };

        assert!(create_http_client(config).is_ok());
    }
}
