//! Progress-callback trait for batch analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! events as [`crate::analyze::Analyzer::analyze_many`] or
//! [`crate::stream::analyze_stream`] works through a set of documents.
//! Single-document calls fire only the document-level events.
//!
//! # Example
//!
//! ```rust
//! use transcript_lens::{AnalysisConfig, AnalysisOutcome, AnalysisProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter {
//!     detected: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for Counter {
//!     fn on_document_complete(&self, _file_name: &str, outcome: &AnalysisOutcome) {
//!         if outcome.success {
//!             self.detected.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Counter { detected: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::AnalysisOutcome;
use std::sync::Arc;

/// Called by the analyzer as it processes documents.
///
/// Implementations must be `Send + Sync`: batch analysis runs several
/// documents concurrently, so `on_document_*` may be called from different
/// tasks at once. All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before a batch starts.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document's bytes are read.
    fn on_document_start(&self, file_name: &str) {
        let _ = file_name;
    }

    /// Called with the finished outcome of a document, whatever its result.
    fn on_document_complete(&self, file_name: &str, outcome: &AnalysisOutcome) {
        let _ = (file_name, outcome);
    }

    /// Called once after every document in a batch has completed.
    ///
    /// # Arguments
    /// * `total_documents` — documents in the batch
    /// * `success_count`   — outcomes with `success = true`
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
