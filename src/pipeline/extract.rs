//! Text extraction: PDF bytes → plain UTF-8 text.
//!
//! The pipeline only depends on the [`TextExtractor`] trait. The default
//! [`PdfTextExtractor`] wraps `pdf-extract`; tests inject fakes.
//!
//! ## Why spawn_blocking?
//!
//! Parsing a PDF is CPU-bound and can take seconds on large documents.
//! Running it on the blocking pool keeps the Tokio workers free for the
//! fetches of other conversions. It also contains parser panics: a panic in
//! the blocking task surfaces as a `JoinError`, which we report as an
//! unparsable document instead of tearing down the caller.

use crate::document::RawDocument;
use crate::error::ConvertError;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

/// Magic bytes every PDF starts with.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Converts a PDF payload to plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of `bytes`, failing with
    /// [`ConvertError::UnparsablePdf`] for corrupt or unsupported input.
    async fn extract(&self, bytes: Bytes) -> Result<RawDocument, ConvertError>;
}

/// Whether `bytes` starts with the PDF header.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Default extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, bytes: Bytes) -> Result<RawDocument, ConvertError> {
        if !is_pdf(&bytes) {
            let head: Vec<u8> = bytes.iter().take(4).copied().collect();
            return Err(ConvertError::UnparsablePdf {
                detail: format!("payload is not a PDF (first bytes: {head:?})"),
            });
        }

        debug!("Extracting text from {} bytes", bytes.len());
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ConvertError::UnparsablePdf {
                detail: format!("extractor panicked: {e}"),
            })?
            .map_err(|e| ConvertError::UnparsablePdf {
                detail: e.to_string(),
            })?;

        info!("Extracted {} characters of text", text.chars().count());
        Ok(RawDocument { text })
    }
}
