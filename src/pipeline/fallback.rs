//! Fallback document emitted in place of a conversion that failed.
//!
//! `<document><error>Conversion failed: MESSAGE</error></document>`
//!
//! A failed conversion is still stored and rendered, so this must be
//! well-formed for any message, including ones quoting XML or raw bytes.

use super::serialize::XmlWriter;
use crate::error::ConvertError;
use quick_xml::events::BytesStart;
use quick_xml::Writer;

/// Prefix placed before the stage error message.
pub const FAILURE_PREFIX: &str = "Conversion failed: ";

/// Used only if the encoder itself fails while building the fallback.
const STATIC_FALLBACK: &str = "<document><error>Conversion failed</error></document>";

/// Build the fallback document for `error`.
pub fn fallback_xml(error: &ConvertError) -> String {
    fallback_xml_for_message(&error.to_string())
}

/// Build the fallback document around an arbitrary message.
pub fn fallback_xml_for_message(message: &str) -> String {
    render(message).unwrap_or_else(|e| {
        tracing::error!("Fallback XML encoding failed: {}", e);
        STATIC_FALLBACK.to_string()
    })
}

fn render(message: &str) -> Result<String, ConvertError> {
    let mut w = XmlWriter::new(Writer::new(Vec::new()));
    w.start(BytesStart::new("document"))?;
    w.text_element(
        BytesStart::new("error"),
        &format!("{FAILURE_PREFIX}{message}"),
    )?;
    w.end("document")?;
    w.finish()
}
