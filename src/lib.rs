//! # transcript-lens
//!
//! Identify the issuing institution, grading scale and course lines of an
//! academic transcript from its text, a PDF text layer, or just its file name.
//!
//! ## Why heuristics?
//!
//! Transcripts are free-form: scanned images, exported PDFs, pasted text,
//! spreadsheets. No single signal is reliable, so the engine layers several
//! cheap ones and reports how confident it is:
//!
//! 1. the institution named in the text (or the file name),
//! 2. the fractional grade-point increments seen (`.67/.33` vs `.7/.3` vs
//!    `.75/.25`), which identify a family of institutions,
//! 3. a custom letter → point scale built from the observed points when
//!    nothing else matches.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Extract    text / PDF text layer (spawn_blocking) / nothing, + file name
//!  ├─ 2. Detect     keyword pass, then pattern pass, over the catalog
//!  ├─ 3. Signals    grade points in [0, 4], letter grades
//!  ├─ 4. Classify   scale family by fingerprint points
//!  ├─ 5. Courses    best-effort course lines
//!  ├─ 6. Synthesize custom scale from ≥ 3 distinct points
//!  └─ 7. Outcome    detection + signals + success flag
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use transcript_lens::{Analyzer, Catalog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let analyzer = Analyzer::default();
//!     let outcome = analyzer.analyze_path("buet_transcript.pdf").await;
//!     match outcome.resolved_institution() {
//!         Some(key) => println!("{key} ({})", outcome.confidence()),
//!         None => println!("inconclusive; ask the user"),
//!     }
//!
//!     let catalog = Catalog::builtin();
//!     if let Some(scale) = outcome.selected_scale(&catalog) {
//!         println!("A- is worth {:?}", scale.point_for("A-"));
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tlens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! transcript-lens = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF support
//!
//! PDF text is read through pdfium, bound at runtime from the configured
//! path, `PDFIUM_LIB_PATH`, or the system library. Text and image inputs
//! never touch pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{resolve_detection, write_json_report, Analyzer};
pub use catalog::{Catalog, GradeBand, Institution, InstitutionDef, PointScale, ScaleFamily};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{ExtractionError, TranscriptError};
pub use output::{
    AnalysisOutcome, Confidence, CustomScale, DetectionMethod, DetectionResult,
    ExtractedCourseRecord, LetterPoint, ScaleClassification,
};
pub use pipeline::extract::ExtractedText;
pub use pipeline::input::{Document, DocumentKind};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{analyze_stream, OutcomeStream};
