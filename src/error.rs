//! Error types for the pdf2xml library.
//!
//! The errors split along the places they can surface:
//!
//! * [`ConvertError`]: a pipeline stage failed. These never escape
//!   [`crate::convert::Converter::convert`]; the orchestrator turns them into a
//!   failed [`crate::output::ConversionResult`] carrying fallback XML. They are
//!   public so callers (and tests) can drive individual stages directly.
//!
//! * [`ConfigError`]: the converter could not be built. Raised before any
//!   conversion starts, so callers report it as a generic failure rather than
//!   as a documented conversion failure.
//!
//! * [`UploadError`]: boundary checks applied to an incoming upload.
//!
//! * [`StoreError`]: lookups against a [`crate::record::ConversionStore`].
//!
//! * [`OutputWriteError`]: writing a finished document to disk failed.

use std::path::PathBuf;
use thiserror::Error;

/// A failure in one stage of the conversion pipeline.
///
/// The `Display` text of each variant is what ends up inside the
/// `<error>` element of the fallback document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    // ── Locating ──────────────────────────────────────────────────────────
    /// The source location is not a store reference or an absolute URL.
    #[error("Invalid source location '{location}': {reason}")]
    InvalidSourceLocation { location: String, reason: String },

    // ── Fetching ──────────────────────────────────────────────────────────
    /// The fetch did not finish within the configured bound.
    #[error("Download timed out after {secs}s")]
    FetchTimeout { secs: u64 },

    /// The payload is larger than the configured download cap.
    #[error("Download too large: exceeds the {limit} byte limit")]
    FetchTooLarge { limit: u64 },

    /// The server answered with a non-2xx status.
    #[error("Download failed with HTTP status {status}")]
    FetchHttpError { status: u16 },

    /// Transport failure other than a timeout (DNS, refused connection, reset).
    #[error("Download failed: {reason}")]
    FetchFailed { reason: String },

    // ── Extracting ────────────────────────────────────────────────────────
    /// The payload is not a PDF the extractor can read.
    #[error("Unparsable PDF: {detail}")]
    UnparsablePdf { detail: String },

    // ── Serializing ───────────────────────────────────────────────────────
    /// The XML encoder itself failed. Not expected in normal operation.
    #[error("XML serialization failed: {0}")]
    SerializationError(String),
}

impl ConvertError {
    pub(crate) fn invalid_location(location: &str, reason: impl Into<String>) -> Self {
        ConvertError::InvalidSourceLocation {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}

/// The converter configuration is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The HTTP client could not be constructed (TLS backend, proxy settings).
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// An upload was rejected at the boundary, before any conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Only `application/pdf` is accepted.
    #[error("Only PDF files are allowed (got '{mime}')")]
    InvalidFileType { mime: String },

    /// The upload exceeds the boundary size cap.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },
}

/// Record lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("Conversion not found")]
    NotFound,

    /// The record exists but belongs to another owner.
    #[error("User not authorized")]
    NotAuthorized,
}

/// Writing the output document failed.
#[derive(Debug, Error)]
#[error("Failed to write output file '{}': {source}", .path.display())]
pub struct OutputWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
