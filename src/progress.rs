//! Progress-callback trait for pipeline state events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to be told
//! which stage a conversion is in. The CLI uses it to drive its spinner; a
//! server could forward the events to a status column.
//!
//! # Example
//!
//! ```rust
//! use pdf2xml::{ConversionProgressCallback, ConverterConfig, PipelineState};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     seen: Mutex<Vec<PipelineState>>,
//! }
//!
//! impl ConversionProgressCallback for Recorder {
//!     fn on_state(&self, state: PipelineState) {
//!         self.seen.lock().unwrap().push(state);
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()))
//!     .build()
//!     .unwrap();
//! ```

use crate::convert::PipelineState;
use crate::output::ConversionStatus;
use std::sync::Arc;

/// Called by the orchestrator as a conversion moves through its states.
///
/// Implementations must be `Send + Sync`: one converter may run many
/// conversions concurrently and they all share the callback. All methods
/// have no-op defaults.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called each time the conversion enters a new state, terminal states
    /// included.
    fn on_state(&self, state: PipelineState) {
        let _ = state;
    }

    /// Called when a stage fails, before the fallback document is built.
    ///
    /// # Arguments
    /// * `state`: the stage that failed
    /// * `error`: human-readable error description
    fn on_stage_error(&self, state: PipelineState, error: &str) {
        let _ = (state, error);
    }

    /// Called once when the conversion reaches a terminal state.
    ///
    /// # Arguments
    /// * `status`: completed or failed
    /// * `xml_len`: byte length of the produced XML (fallback included)
    fn on_conversion_complete(&self, status: ConversionStatus, xml_len: usize) {
        let _ = (status, xml_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
