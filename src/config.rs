//! Configuration types for PDF-to-XML conversion.
//!
//! Every knob lives in [`ConverterConfig`], built via
//! [`ConverterConfigBuilder`]. The config is handed to
//! [`crate::convert::Converter::new`], which passes the relevant parts to the
//! locator and the retriever. Nothing is read from process-wide state after
//! that point, so two converters with different credentials can coexist and
//! tests can point a converter at a local server.

use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default download cap: 50 MB.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default lifetime of a signed content-store URL.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

/// Configuration for a [`crate::convert::Converter`].
///
/// # Example
/// ```rust
/// use pdf2xml::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .fetch_timeout_secs(10)
///     .max_download_bytes(5 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.fetch_timeout_secs, 10);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Upper bound on one fetch: connect, headers and body. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Largest payload the retriever will buffer. Default: 50 MB.
    pub max_download_bytes: u64,

    /// Content-store credentials. Without them no URL is signed and every
    /// location is fetched as given.
    pub store: Option<StoreConfig>,

    /// Lifetime of signed fetch URLs in seconds. Default: 3600.
    pub signed_url_ttl_secs: u64,

    /// `User-Agent` header sent with every fetch.
    pub user_agent: String,

    /// Receives a notification on every pipeline state entered.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            store: None,
            signed_url_ttl_secs: DEFAULT_SIGNED_URL_TTL_SECS,
            user_agent: concat!("pdf2xml/", env!("CARGO_PKG_VERSION")).to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_download_bytes", &self.max_download_bytes)
            .field("store", &self.store)
            .field("signed_url_ttl_secs", &self.signed_url_ttl_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn max_download_bytes(mut self, bytes: u64) -> Self {
        self.config.max_download_bytes = bytes;
        self
    }

    pub fn store(mut self, store: StoreConfig) -> Self {
        self.config.store = Some(store);
        self
    }

    /// Set the store only when credentials are present, e.g. from
    /// [`StoreConfig::from_env`].
    pub fn maybe_store(mut self, store: Option<StoreConfig>) -> Self {
        self.config.store = store;
        self
    }

    pub fn signed_url_ttl_secs(mut self, secs: u64) -> Self {
        self.config.signed_url_ttl_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConfigError> {
        let c = &self.config;
        if c.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch timeout must be at least 1 second".into(),
            ));
        }
        if c.max_download_bytes == 0 {
            return Err(ConfigError::Invalid(
                "download cap must be at least 1 byte".into(),
            ));
        }
        if c.signed_url_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "signed URL lifetime must be at least 1 second".into(),
            ));
        }
        if let Some(ref store) = c.store {
            store.validate()?;
        }
        Ok(self.config)
    }
}

// ── Content store ────────────────────────────────────────────────────────

/// Credentials and addressing for the managed content store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Locations whose host contains this string are store references.
    pub host: String,
    /// Base of the signed download endpoint.
    pub api_base: String,
    /// Resource type under which PDFs are stored.
    pub resource_type: String,
}

impl StoreConfig {
    pub const DEFAULT_HOST: &'static str = "cloudinary.com";
    pub const DEFAULT_API_BASE: &'static str = "https://api.cloudinary.com";
    pub const DEFAULT_RESOURCE_TYPE: &'static str = "raw";

    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            host: Self::DEFAULT_HOST.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            resource_type: Self::DEFAULT_RESOURCE_TYPE.to_string(),
        }
    }

    /// Read credentials from `PDF2XML_STORE_CLOUD_NAME`,
    /// `PDF2XML_STORE_API_KEY` and `PDF2XML_STORE_API_SECRET`.
    ///
    /// Returns `None` unless all three are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let cloud = var("PDF2XML_STORE_CLOUD_NAME")?;
        let key = var("PDF2XML_STORE_API_KEY")?;
        let secret = var("PDF2XML_STORE_API_SECRET")?;
        Some(Self::new(cloud, key, secret))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("cloud_name", &self.cloud_name),
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("host", &self.host),
            ("api_base", &self.api_base),
            ("resource_type", &self.resource_type),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("store {name} is empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("host", &self.host)
            .field("api_base", &self.api_base)
            .field("resource_type", &self.resource_type)
            .finish()
    }
}
