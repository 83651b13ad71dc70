//! Request and result types crossing the [`crate::convert::Converter`] boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which document structure the segmenter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureLevel {
    /// Flat list of paragraphs, no heading detection. (default)
    #[default]
    Basic,
    /// Heading-aware: short capitalised paragraphs open sections.
    Advanced,
}

impl StructureLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureLevel::Basic => "basic",
            StructureLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for StructureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StructureLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(StructureLevel::Basic),
            "advanced" => Ok(StructureLevel::Advanced),
            other => Err(format!(
                "unknown structure level '{other}' (expected 'basic' or 'advanced')"
            )),
        }
    }
}

/// One conversion to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    source_location: String,
    structure_level: StructureLevel,
}

impl ConversionRequest {
    pub fn new(source_location: impl Into<String>, structure_level: StructureLevel) -> Self {
        Self {
            source_location: source_location.into(),
            structure_level,
        }
    }

    /// Opaque reference to the stored PDF: a content-store URL or any
    /// absolute HTTP(S) URL.
    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn structure_level(&self) -> StructureLevel {
        self.structure_level
    }
}

/// Terminal status of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Completed,
    Failed,
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStatus::Completed => f.write_str("completed"),
            ConversionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of [`crate::convert::Converter::convert`].
///
/// `xml` is well-formed in both states: the converted document on
/// success, the fallback `<document><error>…</error></document>` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub xml: String,
    pub status: ConversionStatus,
    /// Message of the stage error that caused a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pages in the produced document, `0` for a failed conversion.
    /// Page boundaries are not detected, so a completed conversion has one.
    pub page_count: usize,
}

impl ConversionResult {
    pub fn is_completed(&self) -> bool {
        self.status == ConversionStatus::Completed
    }
}
