//! Configuration types for transcript analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. The heuristics' thresholds live here rather
//! than as literals in the pipeline stages so two runs can be compared by
//! diffing their configs.

use crate::error::TranscriptError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Configuration for transcript analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use transcript_lens::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .min_line_chars(8)
///     .default_credit(3.0)
///     .concurrency(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Trimmed lines shorter than this are ignored by the course extractor. Default: 5.
    pub min_line_chars: usize,

    /// Credit assigned to a course line when no credit capture parses to a
    /// positive number. Default: 3.0.
    pub default_credit: f64,

    /// Absolute tolerance for matching an observed grade point against a
    /// scale-family fingerprint. Default: 0.01.
    pub fingerprint_tolerance: f64,

    /// Distinct grade points required before a custom scale is synthesized. Default: 3.
    pub min_synthesis_points: usize,

    /// Count the classifier's low-confidence fallback guess toward
    /// `success`. Default: false.
    ///
    /// The fallback fires when grade points were seen but none of them is
    /// diagnostic of any family. It carries no real evidence, so by default
    /// such an outcome stays inconclusive.
    pub count_weak_scale_guess: bool,

    /// Decode text documents that are not valid UTF-8 lossily (U+FFFD)
    /// instead of failing the analysis. Default: false.
    pub lossy_text: bool,

    /// Documents above this size fail with `ExtractionError::TooLarge`. Default: 32 MiB.
    pub max_document_bytes: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit pdfium shared library. When `None`, `PDFIUM_LIB_PATH` is
    /// consulted, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Maximum number of documents analysed at once by batch and stream
    /// entry points. Default: 4.
    pub concurrency: usize,

    /// Optional per-document progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_line_chars: 5,
            default_credit: 3.0,
            fingerprint_tolerance: 0.01,
            min_synthesis_points: 3,
            count_weak_scale_guess: false,
            lossy_text: false,
            max_document_bytes: 32 * 1024 * 1024,
            password: None,
            pdfium_library_path: None,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("min_line_chars", &self.min_line_chars)
            .field("default_credit", &self.default_credit)
            .field("fingerprint_tolerance", &self.fingerprint_tolerance)
            .field("min_synthesis_points", &self.min_synthesis_points)
            .field("count_weak_scale_guess", &self.count_weak_scale_guess)
            .field("lossy_text", &self.lossy_text)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn min_line_chars(mut self, n: usize) -> Self {
        self.config.min_line_chars = n;
        self
    }

    pub fn default_credit(mut self, credit: f64) -> Self {
        self.config.default_credit = credit;
        self
    }

    pub fn fingerprint_tolerance(mut self, tol: f64) -> Self {
        self.config.fingerprint_tolerance = tol;
        self
    }

    pub fn min_synthesis_points(mut self, n: usize) -> Self {
        self.config.min_synthesis_points = n;
        self
    }

    pub fn count_weak_scale_guess(mut self, v: bool) -> Self {
        self.config.count_weak_scale_guess = v;
        self
    }

    pub fn lossy_text(mut self, v: bool) -> Self {
        self.config.lossy_text = v;
        self
    }

    pub fn max_document_bytes(mut self, n: u64) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, TranscriptError> {
        let c = &self.config;
        if !(c.default_credit.is_finite() && c.default_credit > 0.0) {
            return Err(TranscriptError::InvalidConfig(format!(
                "default credit must be a positive number, got {}",
                c.default_credit
            )));
        }
        if !(c.fingerprint_tolerance > 0.0 && c.fingerprint_tolerance < 0.5) {
            return Err(TranscriptError::InvalidConfig(format!(
                "fingerprint tolerance must be in (0, 0.5), got {}",
                c.fingerprint_tolerance
            )));
        }
        if c.min_synthesis_points == 0 {
            return Err(TranscriptError::InvalidConfig(
                "min synthesis points must be ≥ 1".into(),
            ));
        }
        if c.max_document_bytes == 0 {
            return Err(TranscriptError::InvalidConfig(
                "max document bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
