//! Builder pattern implementation for creating DownloadManager instances.
//!
//! # Examples
//!
//! ## Basic Builder Usage
//!
//! ```rust
//! use haul::manager::DownloadManagerBuilder;
//!
//! # fn example() -> Result<(), haul::Error> {
//! let manager = DownloadManagerBuilder::new().retries(5).build()?;
//! assert!(manager.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing Lifecycle Events
//!
//! ```rust
//! use haul::manager::DownloadManagerBuilder;
//! use haul::observer::TracingObserver;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), haul::Error> {
//! // The manager only holds a weak reference: keep the observer alive.
//! let observer = Arc::new(TracingObserver::new());
//! let manager = DownloadManagerBuilder::new().observer(&observer).build()?;
//! # Ok(())
//! # }
//! ```

use super::{config::ManagerConfig, manager::DownloadManager};
use crate::error::Result;
use crate::http::HttpTransferClient;
use crate::observer::Observer;
use crate::transfer::TransferClient;

use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A builder used to create a [`DownloadManager`].
///
/// ```rust
/// # fn main() -> Result<(), haul::Error> {
/// use haul::manager::DownloadManagerBuilder;
///
/// let manager = DownloadManagerBuilder::new().retries(5).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DownloadManagerBuilder {
    config: ManagerConfig,
    client: Option<Arc<dyn TransferClient>>,
    observer: Option<Weak<dyn Observer>>,
}

impl DownloadManagerBuilder {
    /// Creates a builder with the default options.
    pub fn new() -> Self {
        DownloadManagerBuilder::default()
    }

    /// Set the number of retries for transient HTTP failures.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Route HTTP traffic through a proxy.
    pub fn proxy(mut self, proxy: reqwest::Proxy) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Set how long a paused HTTP transfer keeps its connection before
    /// releasing it. The download stays paused and resumes from where it
    /// stopped.
    pub fn suspend_timeout(mut self, timeout: Duration) -> Self {
        self.config.suspend_timeout = timeout;
        self
    }

    /// Use a custom transfer client instead of the default HTTP one.
    ///
    /// The HTTP options (`retries`, `proxy`, `headers`, `suspend_timeout`)
    /// only configure the default client. The manager still reports them,
    /// but a custom client is not affected by them.
    pub fn client(mut self, client: Arc<dyn TransferClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Register the observer notified of every lifecycle transition.
    ///
    /// Only a weak reference is kept: notifications stop once the last
    /// `Arc` to the observer is dropped.
    pub fn observer<O: Observer + 'static>(mut self, observer: &Arc<O>) -> Self {
        let observer: Weak<dyn Observer> = Arc::<O>::downgrade(observer);
        self.observer = Some(observer);
        self
    }

    /// Helper method to get or create a new HeaderMap.
    fn new_header(&self) -> HeaderMap {
        match self.config.headers {
            Some(ref h) => h.to_owned(),
            _ => HeaderMap::new(),
        }
    }

    /// Add the http headers.
    ///
    /// You can call `.headers()` multiple times and all `HeaderMap` will be
    /// merged into a single one.
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue, HeaderMap};
    /// use haul::manager::DownloadManagerBuilder;
    ///
    /// let ua = HeaderValue::from_str("curl/7.87").expect("Invalid UA");
    ///
    /// let builder = DownloadManagerBuilder::new()
    ///     .headers(HeaderMap::from_iter([(header::USER_AGENT, ua)]));
    /// ```
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut new = self.new_header();
        new.extend(headers);

        self.config.headers = Some(new);
        self
    }

    /// Add the http header
    ///
    /// ```
    /// use reqwest::header::{self, HeaderValue};
    /// use haul::manager::DownloadManagerBuilder;
    ///
    /// let auth = HeaderValue::from_str("Basic aGk6MTIzNDU2Cg==").expect("Invalid auth");
    ///
    /// let builder = DownloadManagerBuilder::new().header(header::AUTHORIZATION, auth);
    /// ```
    pub fn header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        let mut new = self.new_header();

        new.insert(name, value);

        self.config.headers = Some(new);
        self
    }

    /// Create the [`DownloadManager`] with the specified options.
    ///
    /// Fails only if the default HTTP client cannot be built.
    pub fn build(self) -> Result<DownloadManager> {
        let client: Arc<dyn TransferClient> = match self.client {
            Some(client) => client,
            None => Arc::new(HttpTransferClient::new(
                self.config.http_client_config(),
            )?),
        };
        Ok(DownloadManager::new(self.config, client, self.observer))
    }
}
