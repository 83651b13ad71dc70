//! # pdf2xml
//!
//! Convert PDF documents into a simple structured XML document.
//!
//! The text layer of the PDF is extracted, split into paragraphs on blank
//! lines and, in advanced mode, grouped into sections under short
//! capitalised lines that look like headings. Layout, tables, images and
//! fonts are not reconstructed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source location
//!  │
//!  ├─ 1. Locate     sign store URLs, pass plain URLs through
//!  ├─ 2. Fetch      one GET, bounded by timeout and size cap
//!  ├─ 3. Extract    PDF bytes → text (CPU-bound, spawn_blocking)
//!  ├─ 4. Segment    paragraphs, optional heading/section detection
//!  └─ 5. Serialize  pretty-printed XML
//!
//!  any stage error ──▶ <document><error>Conversion failed: …</error></document>
//! ```
//!
//! A conversion never returns an error: a failed stage produces a result
//! with [`ConversionStatus::Failed`] whose `xml` is the fallback document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2xml::{convert, ConverterConfig, StructureLevel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::default();
//!     let result = convert(
//!         "https://example.com/report.pdf",
//!         StructureLevel::Advanced,
//!         &config,
//!     )
//!     .await?;
//!     println!("{}", result.xml);
//!     eprintln!("status: {}", result.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2xml` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2xml = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, StoreConfig};
pub use convert::{convert, Converter, PipelineState, Stage};
pub use document::{Block, DocumentTree, Page, Paragraph, RawDocument, Section};
pub use error::{ConfigError, ConvertError, OutputWriteError, StoreError, UploadError};
pub use output::{ConversionRequest, ConversionResult, ConversionStatus, StructureLevel};
pub use pipeline::extract::{PdfTextExtractor, TextExtractor};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{find_owned, ConversionRecord, ConversionStore, MemoryStore, RecordId};
pub use upload::{validate_mime_type, validate_upload_size, MAX_UPLOAD_BYTES};
