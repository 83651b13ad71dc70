//! Checks applied to an incoming upload before any conversion runs.

use crate::error::UploadError;

/// Largest upload accepted at the boundary (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The only accepted MIME type.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Accept `application/pdf` only. Parameters (`; charset=...`) and case are
/// ignored.
pub fn validate_mime_type(mime: &str) -> Result<(), UploadError> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(PDF_MIME_TYPE) {
        Ok(())
    } else {
        Err(UploadError::InvalidFileType {
            mime: mime.to_string(),
        })
    }
}

/// Reject uploads larger than [`MAX_UPLOAD_BYTES`].
pub fn validate_upload_size(len: u64) -> Result<(), UploadError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadError::UploadTooLarge {
            size: len,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
