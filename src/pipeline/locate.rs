//! Resource location: turn a stored-file reference into a fetchable URL.
//!
//! Uploaded PDFs live in a managed content store and are delivered as
//! private resources, so their public URL is not directly fetchable. For
//! those we derive the object path and build a signed download URL that
//! expires after the configured TTL. Any other absolute HTTP(S) URL is
//! returned untouched.
//!
//! ```text
//! https://res.cloudinary.com/demo/raw/upload/v1712/pdf-converter/report.pdf
//!                                         └──────── object path ────────┘
//!                                               (extension stripped)
//! ```

use crate::config::StoreConfig;
use crate::error::ConvertError;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Delimiter between the store's public prefix and the object path.
pub const STORE_PATH_DELIMITER: &str = "/upload/";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolves source locations using injected store credentials.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    store: Option<StoreConfig>,
    ttl_secs: u64,
}

impl ResourceLocator {
    pub fn new(store: Option<StoreConfig>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Resolve `location` using the current wall-clock time.
    pub fn resolve(&self, location: &str) -> Result<Url, ConvertError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.resolve_at(location, now)
    }

    /// Resolve `location` as if the current Unix time were `now`.
    pub fn resolve_at(&self, location: &str, now: u64) -> Result<Url, ConvertError> {
        let location = location.trim();
        if !is_url(location) {
            return Err(ConvertError::invalid_location(
                location,
                "not an absolute HTTP(S) URL",
            ));
        }
        let url = Url::parse(location)
            .map_err(|e| ConvertError::invalid_location(location, e.to_string()))?;

        let Some(store) = self.store_for(&url) else {
            debug!("Passing through non-store URL: {}", url);
            return Ok(url);
        };

        let object_path = object_path(location)?;
        debug!("Extracted store object path: {}", object_path);
        sign_download_url(store, &object_path, &store.resource_type, now, self.ttl_secs)
    }

    /// The store config applies when the URL's host belongs to the store.
    /// Without credentials no URL is treated as a store URL, which keeps
    /// publicly delivered store objects fetchable.
    fn store_for(&self, url: &Url) -> Option<&StoreConfig> {
        let host = url.host_str()?;
        match self.store {
            Some(ref store) if host.contains(store.host.as_str()) => Some(store),
            _ => None,
        }
    }
}

/// Derive the canonical object path from a store URL: everything after
/// [`STORE_PATH_DELIMITER`], minus query, fragment and the trailing extension.
pub fn object_path(location: &str) -> Result<String, ConvertError> {
    let (_, rest) = location.split_once(STORE_PATH_DELIMITER).ok_or_else(|| {
        ConvertError::invalid_location(location, "invalid store URL format: missing '/upload/'")
    })?;

    let rest = rest
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_matches('/');

    let path = strip_extension(rest);
    if path.is_empty() {
        return Err(ConvertError::invalid_location(
            location,
            "invalid store URL format: empty object path",
        ));
    }
    Ok(path.to_string())
}

/// Remove a trailing `.ext` from the last path segment only.
fn strip_extension(path: &str) -> &str {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..segment_start + dot],
        _ => path,
    }
}

/// Build a signed, time-limited download URL for `object_path`.
///
/// Pure: the same inputs always produce the same URL.
pub fn sign_download_url(
    store: &StoreConfig,
    object_path: &str,
    resource_type: &str,
    now: u64,
    ttl_secs: u64,
) -> Result<Url, ConvertError> {
    let expires_at = now.saturating_add(ttl_secs).to_string();
    let timestamp = now.to_string();

    // Parameters in name order, as the signature requires.
    let params = [
        ("expires_at", expires_at.as_str()),
        ("public_id", object_path),
        ("timestamp", timestamp.as_str()),
    ];
    let signature = sign_params(&params, &store.api_secret);

    let endpoint = format!(
        "{}/v1_1/{}/{}/download",
        store.api_base.trim_end_matches('/'),
        store.cloud_name,
        resource_type
    );
    let mut url = Url::parse(&endpoint).map_err(|e| {
        ConvertError::invalid_location(object_path, format!("bad store endpoint '{endpoint}': {e}"))
    })?;
    url.query_pairs_mut()
        .append_pair("api_key", &store.api_key)
        .append_pair("expires_at", &expires_at)
        .append_pair("public_id", object_path)
        .append_pair("signature", &signature)
        .append_pair("timestamp", &timestamp);
    Ok(url)
}

/// `hex(sha256("k1=v1&k2=v2" + secret))` over name-sorted parameters.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
