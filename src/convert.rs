//! Conversion orchestrator: one explicit state machine per conversion.
//!
//! ```text
//! Idle ─▶ Locating ─▶ Fetching ─▶ Extracting ─▶ Segmenting ─▶ Serializing ─▶ Completed
//!            │           │            │             │              │
//!            └───────────┴────────────┴─────────────┴──────────────┴────────▶ Failed
//! ```
//!
//! Every [`Stage`] variant carries the input its work needs, and
//! [`Converter::step`] performs that work and returns the next stage. The
//! first error moves straight to [`Stage::Failed`]; nothing is retried and no
//! later stage runs. [`Converter::convert`] drives the machine to a terminal
//! stage and turns it into a [`ConversionResult`], so a stage error never
//! crosses that boundary: the caller gets a failed result carrying the
//! fallback document instead.
//!
//! Conversions share nothing mutable. A [`Converter`] can be cloned into as
//! many tasks as needed; clones share the HTTP connection pool and the
//! extractor.

use crate::config::ConverterConfig;
use crate::document::{DocumentTree, RawDocument};
use crate::error::{ConfigError, ConvertError, OutputWriteError};
use crate::output::{ConversionRequest, ConversionResult, ConversionStatus, StructureLevel};
use crate::pipeline::extract::{PdfTextExtractor, TextExtractor};
use crate::pipeline::fetch::Retriever;
use crate::pipeline::locate::ResourceLocator;
use crate::pipeline::{fallback, segment, serialize};
use crate::progress::ProgressCallback;
use bytes::Bytes;
use futures::FutureExt;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const INTERNAL_ERROR_MESSAGE: &str = "internal pipeline error";

/// Payload-free view of a [`Stage`], for logging and progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Locating,
    Fetching,
    Extracting,
    Segmenting,
    Serializing,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Locating => "locating",
            PipelineState::Fetching => "fetching",
            PipelineState::Extracting => "extracting",
            PipelineState::Segmenting => "segmenting",
            PipelineState::Serializing => "serializing",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One state of a conversion, holding what the next transition consumes.
#[derive(Debug)]
pub enum Stage {
    Idle(ConversionRequest),
    Locating(ConversionRequest),
    Fetching {
        url: Url,
        level: StructureLevel,
    },
    Extracting {
        bytes: Bytes,
        level: StructureLevel,
    },
    Segmenting {
        raw: RawDocument,
        level: StructureLevel,
    },
    Serializing {
        tree: DocumentTree,
    },
    Completed {
        xml: String,
        page_count: usize,
    },
    Failed {
        /// The stage whose work produced `error`.
        at: PipelineState,
        error: ConvertError,
    },
}

impl Stage {
    pub fn state(&self) -> PipelineState {
        match self {
            Stage::Idle(_) => PipelineState::Idle,
            Stage::Locating(_) => PipelineState::Locating,
            Stage::Fetching { .. } => PipelineState::Fetching,
            Stage::Extracting { .. } => PipelineState::Extracting,
            Stage::Segmenting { .. } => PipelineState::Segmenting,
            Stage::Serializing { .. } => PipelineState::Serializing,
            Stage::Completed { .. } => PipelineState::Completed,
            Stage::Failed { .. } => PipelineState::Failed,
        }
    }

    fn failed(at: PipelineState, error: ConvertError) -> Self {
        Stage::Failed { at, error }
    }

    /// Final result of a terminal stage. A non-terminal stage has no result
    /// yet and is handed back unchanged.
    pub fn into_result(self) -> Result<ConversionResult, Stage> {
        match self {
            Stage::Completed { xml, page_count } => Ok(ConversionResult {
                xml,
                status: ConversionStatus::Completed,
                error: None,
                page_count,
            }),
            Stage::Failed { error, .. } => Ok(ConversionResult {
                xml: fallback::fallback_xml(&error),
                status: ConversionStatus::Failed,
                error: Some(error.to_string()),
                page_count: 0,
            }),
            pending => Err(pending),
        }
    }
}

/// Runs conversions. Build once, share across tasks.
#[derive(Clone)]
pub struct Converter {
    locator: ResourceLocator,
    retriever: Retriever,
    extractor: Arc<dyn TextExtractor>,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("locator", &self.locator)
            .field("retriever", &self.retriever)
            .field("extractor", &"<dyn TextExtractor>")
            .finish()
    }
}

impl Converter {
    /// Build a converter with the default `pdf-extract` backed extractor.
    pub fn new(config: &ConverterConfig) -> Result<Self, ConfigError> {
        Self::with_extractor(config, Arc::new(PdfTextExtractor))
    }

    /// Build a converter around a custom text extractor.
    pub fn with_extractor(
        config: &ConverterConfig,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            locator: ResourceLocator::new(config.store.clone(), config.signed_url_ttl_secs),
            retriever: Retriever::new(config)?,
            extractor,
            progress: config.progress_callback.clone(),
        })
    }

    /// Convert the PDF at `request.source_location()`.
    ///
    /// Never fails: stage errors produce a [`ConversionStatus::Failed`]
    /// result whose `xml` is the fallback document.
    pub async fn convert(&self, request: ConversionRequest) -> ConversionResult {
        info!(
            "Starting conversion ({}): {}",
            request.structure_level(),
            request.source_location()
        );
        self.run_guarded(Stage::Idle(request)).await
    }

    /// Convert a PDF payload the caller already holds, skipping location
    /// and retrieval.
    pub async fn convert_bytes(
        &self,
        bytes: impl Into<Bytes>,
        level: StructureLevel,
    ) -> ConversionResult {
        let bytes = bytes.into();
        info!("Starting conversion ({}) of {} bytes", level, bytes.len());
        self.run_guarded(Stage::Extracting { bytes, level }).await
    }

    /// Convert and write the resulting XML to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files. The
    /// fallback document of a failed conversion is written too; check the
    /// returned status.
    pub async fn convert_to_file(
        &self,
        request: ConversionRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionResult, OutputWriteError> {
        let result = self.convert(request).await;
        write_atomic(output_path.as_ref(), &result.xml).await?;
        Ok(result)
    }

    /// [`Self::run`], with a panic anywhere in the pipeline turned into a
    /// failed result.
    async fn run_guarded(&self, stage: Stage) -> ConversionResult {
        match AssertUnwindSafe(self.run(stage)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Conversion pipeline panicked");
                let result = ConversionResult {
                    xml: fallback::fallback_xml_for_message(INTERNAL_ERROR_MESSAGE),
                    status: ConversionStatus::Failed,
                    error: Some(INTERNAL_ERROR_MESSAGE.to_string()),
                    page_count: 0,
                };
                if let Some(ref cb) = self.progress {
                    cb.on_conversion_complete(result.status, result.xml.len());
                }
                result
            }
        }
    }

    /// Drive `stage` until it reaches a terminal state.
    pub async fn run(&self, mut stage: Stage) -> ConversionResult {
        let start = Instant::now();
        self.notify_state(&stage);

        let result = loop {
            match stage.into_result() {
                Ok(result) => break result,
                Err(pending) => {
                    stage = self.step(pending).await;
                    self.notify_state(&stage);
                }
            }
        };

        match result.status {
            ConversionStatus::Completed => info!(
                "Conversion complete: {} bytes of XML in {}ms",
                result.xml.len(),
                start.elapsed().as_millis()
            ),
            ConversionStatus::Failed => warn!(
                "Conversion failed after {}ms: {}",
                start.elapsed().as_millis(),
                result.error.as_deref().unwrap_or_default()
            ),
        }
        if let Some(ref cb) = self.progress {
            cb.on_conversion_complete(result.status, result.xml.len());
        }
        result
    }

    /// Perform the work of `stage` and return the next stage.
    ///
    /// Terminal stages are returned unchanged.
    pub async fn step(&self, stage: Stage) -> Stage {
        let from = stage.state();
        let next = match stage {
            Stage::Idle(request) => Stage::Locating(request),

            Stage::Locating(request) => match self.locator.resolve(request.source_location()) {
                Ok(url) => Stage::Fetching {
                    url,
                    level: request.structure_level(),
                },
                Err(e) => Stage::failed(from, e),
            },

            Stage::Fetching { url, level } => match self.retriever.fetch(&url).await {
                Ok(bytes) => Stage::Extracting { bytes, level },
                Err(e) => Stage::failed(from, e),
            },

            Stage::Extracting { bytes, level } => match self.extractor.extract(bytes).await {
                Ok(raw) => Stage::Segmenting { raw, level },
                Err(e) => Stage::failed(from, e),
            },

            Stage::Segmenting { raw, level } => {
                let tree = segment::segment(&raw, level);
                debug!(
                    "Segmented into {} paragraphs, {} sections",
                    tree.paragraphs().count(),
                    tree.sections().count()
                );
                Stage::Serializing { tree }
            }

            Stage::Serializing { tree } => match serialize::to_xml(&tree) {
                Ok(xml) => Stage::Completed {
                    xml,
                    page_count: tree.page_count(),
                },
                Err(e) => Stage::failed(from, e),
            },

            terminal @ (Stage::Completed { .. } | Stage::Failed { .. }) => terminal,
        };

        debug!("Pipeline transition: {} -> {}", from, next.state());
        if let Stage::Failed { at, ref error } = next {
            if at == from {
                warn!("Stage {} failed: {}", at, error);
                if let Some(ref cb) = self.progress {
                    cb.on_stage_error(at, &error.to_string());
                }
            }
        }
        next
    }

    fn notify_state(&self, stage: &Stage) {
        if let Some(ref cb) = self.progress {
            cb.on_state(stage.state());
        }
    }
}

/// Build a converter from `config` and run one conversion.
///
/// Only configuration problems are returned as `Err`; they are distinct
/// from a documented conversion failure, which comes back as
/// `Ok(result)` with [`ConversionStatus::Failed`].
pub async fn convert(
    source_location: impl Into<String>,
    structure_level: StructureLevel,
    config: &ConverterConfig,
) -> Result<ConversionResult, ConfigError> {
    let converter = Converter::new(config)?;
    Ok(converter
        .convert(ConversionRequest::new(source_location, structure_level))
        .await)
}

/// Write `contents` to `path` through a temp file and a rename, creating
/// parent directories as needed. Readers never see a partial file.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputWriteError> {
    let fail = |source| OutputWriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = path.with_extension("xml.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}
