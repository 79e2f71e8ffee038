//! Configuration types for the conversion client.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Callers set only what they care about and rely
//! on the documented defaults for the rest.

use crate::error::ClientError;
use crate::pipeline::validate::MAX_FILE_SIZE;
use crate::progress::ObserverRef;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Default service address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default delay between status requests.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Configuration for a conversion client.
///
/// # Example
/// ```rust
/// use audioconv::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://converter.local:5000")
///     .poll_interval_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_interval().as_millis(), 500);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Root URL of the conversion service. Default: `http://127.0.0.1:5000`.
    ///
    /// May carry a path prefix (`https://host/tools/audio`); the endpoints
    /// `upload`, `status/{id}` and `download/{id}` are appended to it.
    pub base_url: String,

    /// Delay between status requests in milliseconds. Default: 1000. Minimum: 10.
    pub poll_interval_ms: u64,

    /// Largest file accepted by validation, in bytes. Default: 100 MiB.
    pub max_file_size: u64,

    /// Timeout for the upload request in seconds. Default: 300.
    pub upload_timeout_secs: u64,

    /// Timeout for each status request in seconds. Default: 30.
    pub status_timeout_secs: u64,

    /// Timeout for fetching the converted file in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives session events. Default: none.
    pub observer: Option<ObserverRef>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_file_size: MAX_FILE_SIZE,
            upload_timeout_secs: 300,
            status_timeout_secs: 30,
            download_timeout_secs: 120,
            observer: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_file_size", &self.max_file_size)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("status_timeout_secs", &self.status_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn SessionObserver>"))
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse `base_url`, normalised so relative endpoint paths append to it.
    pub fn parsed_base_url(&self) -> Result<Url, ClientError> {
        parse_base_url(&self.base_url)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(10);
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn status_timeout_secs(mut self, secs: u64) -> Self {
        self.config.status_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn observer(mut self, observer: ObserverRef) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let c = &self.config;
        parse_base_url(&c.base_url)?;
        if c.max_file_size == 0 {
            return Err(ClientError::InvalidConfig(
                "Maximum file size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ClientError::InvalidConfig(format!("Invalid base URL '{raw}': {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ClientError::InvalidConfig(format!(
            "Base URL must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
