//! Analysis entry points: one document in, one [`AnalysisOutcome`] out.
//!
//! [`Analyzer`] holds the read-only [`Catalog`] (behind an `Arc`) and the
//! [`AnalysisConfig`]; every call builds its own outcome and shares nothing
//! mutable with concurrent calls. `analyze*` never returns `Err`: a document
//! that cannot be decoded yields an outcome with `error` set and
//! `success = false`.
//!
//! Use [`crate::stream::analyze_stream`] instead of
//! [`Analyzer::analyze_many`] to receive outcomes as they complete.

use crate::catalog::Catalog;
use crate::config::AnalysisConfig;
use crate::error::{ExtractionError, TranscriptError};
use crate::output::{
    AnalysisOutcome, Confidence, DetectionMethod, DetectionResult, ScaleClassification,
};
use crate::pipeline::extract::{self, ExtractedText};
use crate::pipeline::input::{file_name_of, Document, DocumentKind};
use crate::pipeline::{classify, courses, detect, signals, synthesize};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs analyses against one catalog with one configuration.
///
/// Cheap to clone: the catalog is shared.
#[derive(Debug, Clone)]
pub struct Analyzer {
    catalog: Arc<Catalog>,
    config: AnalysisConfig,
}

impl Default for Analyzer {
    /// The built-in catalog with the default configuration.
    fn default() -> Self {
        Self::new(Arc::new(Catalog::builtin()), AnalysisConfig::default())
    }
}

impl Analyzer {
    pub fn new(catalog: Arc<Catalog>, config: AnalysisConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze an in-memory document.
    ///
    /// # Example
    /// ```rust
    /// use transcript_lens::{Analyzer, Document};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let analyzer = Analyzer::default();
    /// let doc = Document::new("result.txt", "North South University result: A- 3.7");
    /// let outcome = analyzer.analyze(doc).await;
    /// assert_eq!(outcome.institution_key(), Some("nsu"));
    /// # }
    /// ```
    pub async fn analyze(&self, document: Document) -> AnalysisOutcome {
        let file_name = document.file_name.clone();
        self.notify_start(&file_name);
        let outcome = self.run(document).await;
        self.notify_complete(&outcome);
        outcome
    }

    /// Read a file and analyze it. Read failures are captured as
    /// [`ExtractionError::Unreadable`] or [`ExtractionError::TooLarge`].
    pub async fn analyze_path(&self, path: impl AsRef<Path>) -> AnalysisOutcome {
        let path = path.as_ref();
        let file_name = file_name_of(path);
        self.notify_start(&file_name);

        let outcome = match Document::read(path, self.config.max_document_bytes).await {
            Ok(document) => self.run(document).await,
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                failed_outcome(file_name, None, e)
            }
        };

        self.notify_complete(&outcome);
        outcome
    }

    /// Synchronous wrapper around [`Analyzer::analyze`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// within an async context.
    pub fn analyze_sync(&self, document: Document) -> Result<AnalysisOutcome, TranscriptError> {
        let runtime = tokio::runtime::Runtime::new().map_err(|e| {
            TranscriptError::Internal(format!("Failed to create tokio runtime: {}", e))
        })?;
        Ok(runtime.block_on(self.analyze(document)))
    }

    /// Analyze several files with at most `config.concurrency` in flight.
    ///
    /// Outcomes are returned in input order.
    pub async fn analyze_many<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<AnalysisOutcome> {
        let total = paths.len();
        info!("Analysing {} documents", total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        let outcomes: Vec<AnalysisOutcome> = stream::iter(paths.iter())
            .map(|p| self.analyze_path(p.as_ref()))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let successes = outcomes.iter().filter(|o| o.success).count();
        info!("Batch complete: {}/{} detected", successes, total);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(total, successes);
        }
        outcomes
    }

    /// Analyze a file and write the outcome as pretty JSON to `report_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn analyze_to_file(
        &self,
        path: impl AsRef<Path>,
        report_path: impl AsRef<Path>,
    ) -> Result<AnalysisOutcome, TranscriptError> {
        let outcome = self.analyze_path(path).await;
        write_json_report(&outcome, report_path).await?;
        Ok(outcome)
    }

    /// Run every stage after extraction over already-extracted text.
    ///
    /// Infallible: stages that find nothing contribute empty results.
    pub fn analyze_extracted(
        &self,
        file_name: &str,
        kind: DocumentKind,
        text: ExtractedText,
    ) -> AnalysisOutcome {
        let catalog = self.catalog.as_ref();
        let config = &self.config;

        // ── Step 2: Institution detection ────────────────────────────────
        let direct = detect::detect(catalog, &text);

        // ── Step 3: Grade signals ────────────────────────────────────────
        let points = signals::extract_grade_points(&text);
        let letters = signals::extract_letter_grades(&text);
        debug!(
            "{}: {} grade points, {} letter grades",
            file_name,
            points.len(),
            letters.len()
        );

        // ── Step 4: Scale classification ─────────────────────────────────
        let scale_family = classify::classify(catalog, &points, config.fingerprint_tolerance);
        let detection = resolve_detection(direct, scale_family.as_ref());

        // ── Step 5: Courses ──────────────────────────────────────────────
        let course_records =
            courses::extract_courses(&text, config.min_line_chars, config.default_credit);
        debug!("{}: {} course lines", file_name, course_records.len());

        // ── Step 6: Custom scale ─────────────────────────────────────────
        let custom_scale = (points.len() >= config.min_synthesis_points)
            .then(|| synthesize::synthesize(&points, &letters));

        // ── Step 7: Success ──────────────────────────────────────────────
        let family_counts = scale_family
            .as_ref()
            .is_some_and(|c| !c.is_weak_guess() || config.count_weak_scale_guess);
        let success = detection.is_hit() || family_counts || custom_scale.is_some();

        AnalysisOutcome {
            success,
            file_name: file_name.to_string(),
            document_kind: Some(kind),
            detection,
            scale_family,
            detected_grade_points: points,
            detected_grades: letters,
            courses: course_records,
            custom_scale,
            raw_text: text.into_string(),
            error: None,
        }
    }

    async fn run(&self, document: Document) -> AnalysisOutcome {
        let start = Instant::now();
        let file_name = document.file_name.clone();
        let kind = document.kind();
        info!("Analysing {} ({})", file_name, kind);

        // ── Step 1: Text extraction ──────────────────────────────────────
        let text = match extract::extract_text(document, &self.config).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Extraction failed for {}: {}", file_name, e);
                return failed_outcome(file_name, Some(kind), e);
            }
        };

        let outcome = self.analyze_extracted(&file_name, kind, text);
        info!(
            "Analysed {}: institution={} confidence={} method={} success={} ({}ms)",
            file_name,
            outcome.institution_key().unwrap_or("-"),
            outcome.detection.confidence,
            outcome.detection.method,
            outcome.success,
            start.elapsed().as_millis()
        );
        outcome
    }

    fn notify_start(&self, file_name: &str) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(file_name);
        }
    }

    fn notify_complete(&self, outcome: &AnalysisOutcome) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_complete(&outcome.file_name, outcome);
        }
    }
}

/// Reconcile the direct detector hit with the scale classification.
///
/// * a direct hit always wins; a high-confidence classification raises its
///   confidence to at least medium and never lowers it
/// * without a direct hit, a classification with a representative is
///   adopted at medium confidence
/// * the fallback guess (no representative) is never adopted
pub fn resolve_detection(
    direct: Option<DetectionResult>,
    classification: Option<&ScaleClassification>,
) -> DetectionResult {
    match (direct, classification) {
        (Some(mut hit), Some(c)) => {
            if c.confidence == Confidence::High {
                hit.confidence = hit.confidence.max(Confidence::Medium);
            }
            hit
        }
        (Some(hit), None) => hit,
        (None, Some(c)) => match &c.representative_institution_key {
            Some(rep) => DetectionResult {
                institution_key: Some(rep.clone()),
                confidence: Confidence::Medium,
                method: DetectionMethod::ScaleInference,
            },
            None => DetectionResult::none(),
        },
        (None, None) => DetectionResult::none(),
    }
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub async fn write_json_report<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), TranscriptError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TranscriptError::Internal(format!("Failed to serialise report: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TranscriptError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| TranscriptError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| TranscriptError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote report {}", path.display());
    Ok(())
}

fn failed_outcome(
    file_name: String,
    kind: Option<DocumentKind>,
    error: ExtractionError,
) -> AnalysisOutcome {
    AnalysisOutcome {
        success: false,
        file_name,
        document_kind: kind,
        error: Some(error),
        ..Default::default()
    }
}
