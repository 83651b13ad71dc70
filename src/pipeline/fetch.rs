//! Retrieval: one bounded HTTP GET for the PDF payload.
//!
//! The whole payload is buffered in memory because the extractor wants a
//! byte slice. Two bounds keep that safe:
//!
//! * a timeout set on the client covers connect, headers and body, so a
//!   slow-drip server cannot hold the conversion open;
//! * a size cap is checked against `Content-Length` up front and again while
//!   the body streams in, so a missing or lying header cannot make us buffer
//!   more than the cap.
//!
//! There are no retries. A failed fetch is terminal for the conversion.

use crate::config::ConverterConfig;
use crate::error::{ConfigError, ConvertError};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Performs single bounded fetches. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct Retriever {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl Retriever {
    /// Build a retriever from the fetch bounds in `config`.
    pub fn new(config: &ConverterConfig) -> Result<Self, ConfigError> {
        let timeout = config.fetch_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            max_bytes: config.max_download_bytes,
        })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Fetch `url` and return the full body.
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, ConvertError> {
        info!("Downloading PDF from: {}", redact(url));

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Download failed with status {}", status);
            return Err(ConvertError::FetchHttpError {
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                warn!("Declared length {} exceeds cap {}", len, self.max_bytes);
                return Err(ConvertError::FetchTooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let capacity = response
            .content_length()
            .unwrap_or(0)
            .min(self.max_bytes) as usize;
        let mut body = BytesMut::with_capacity(capacity);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_transport_error(e))?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                warn!(
                    "Body exceeded cap of {} bytes while streaming",
                    self.max_bytes
                );
                return Err(ConvertError::FetchTooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        info!("Download successful, received {} bytes", body.len());
        Ok(body.freeze())
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ConvertError {
        if e.is_timeout() {
            ConvertError::FetchTimeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            debug!("Transport error: {:?}", e);
            // Strip the URL: it may carry a signature.
            ConvertError::FetchFailed {
                reason: e.without_url().to_string(),
            }
        }
    }
}

/// Signed URLs carry credentials in the query; never log them.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    if shown.query().is_some() {
        shown.set_query(Some("…"));
    }
    shown.to_string()
}
