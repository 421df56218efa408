//! Error types for the transcript-lens library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranscriptError`] — **Fatal**: something outside a single analysis is
//!   broken (invalid configuration, unloadable catalog, report file cannot
//!   be written). Returned as `Err(TranscriptError)` from builders, catalog
//!   loaders and [`crate::analyze::Analyzer::analyze_to_file`].
//!
//! * [`ExtractionError`] — **Captured**: the document handed to one analysis
//!   call could not be decoded. It never escapes `analyze*`; it is stored in
//!   [`crate::output::AnalysisOutcome::error`] with `success = false`, and the
//!   process keeps serving later calls.
//!
//! "Nothing detected" is neither: an inconclusive outcome simply has
//! `success = false` and `error = None`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the transcript-lens library.
///
/// Document decoding failures use [`ExtractionError`] and are stored in
/// [`crate::output::AnalysisOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TranscriptError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catalog errors ────────────────────────────────────────────────────
    /// Catalog file could not be read.
    #[error("Failed to read catalog '{path}': {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catalog JSON did not match the expected schema.
    #[error("Catalog is not valid JSON: {0}")]
    CatalogParse(String),

    /// A recognition pattern of an institution is not a valid regex.
    #[error("Institution '{institution}' has an invalid pattern '{pattern}': {detail}")]
    InvalidPattern {
        institution: String,
        pattern: String,
        detail: String,
    },

    /// The catalog violates one of its structural invariants.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the JSON report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A document could not be decoded as its detected type.
///
/// Fatal to the current analysis call only. Stored in
/// [`crate::output::AnalysisOutcome::error`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// The document bytes could not be read from disk.
    #[error("Cannot read '{file_name}': {detail}")]
    Unreadable { file_name: String, detail: String },

    /// The document exceeds the configured size limit.
    #[error("'{file_name}' is {size} bytes, above the {limit}-byte limit")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },

    /// A text document is not valid UTF-8.
    #[error("'{file_name}' is not valid UTF-8 text: {detail}")]
    InvalidText { file_name: String, detail: String },

    /// The file claims to be a PDF but lacks the `%PDF` header.
    #[error("'{file_name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { file_name: String, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{file_name}' is corrupt: {detail}")]
    CorruptPdf { file_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{file_name}' is encrypted and requires a password")]
    PasswordRequired { file_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{file_name}'")]
    WrongPassword { file_name: String },

    /// No pdfium library could be bound.
    #[error(
        "Failed to bind to pdfium library: {detail}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or pass --pdfium-lib."
    )]
    PdfiumUnavailable { detail: String },

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {detail}")]
    Internal { detail: String },
}

impl ExtractionError {
    /// Short machine-friendly label, used in logs and the CLI summary.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionError::Unreadable { .. } => "unreadable",
            ExtractionError::TooLarge { .. } => "too_large",
            ExtractionError::InvalidText { .. } => "invalid_text",
            ExtractionError::NotAPdf { .. } => "not_a_pdf",
            ExtractionError::CorruptPdf { .. } => "corrupt_pdf",
            ExtractionError::PasswordRequired { .. } => "password_required",
            ExtractionError::WrongPassword { .. } => "wrong_password",
            ExtractionError::PdfiumUnavailable { .. } => "pdfium_unavailable",
            ExtractionError::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_large_display() {
        let e = ExtractionError::TooLarge {
            file_name: "big.pdf".into(),
            size: 100,
            limit: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("big.pdf"), "got: {msg}");
        assert!(msg.contains("10-byte"), "got: {msg}");
    }

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = ExtractionError::NotAPdf {
            file_name: "fake.pdf".into(),
            magic: b"GIF8".to_vec(),
        };
        assert!(e.to_string().contains("fake.pdf"));
        assert_eq!(e.label(), "not_a_pdf");
    }

    #[test]
    fn extraction_error_serialises_with_kind_tag() {
        let e = ExtractionError::PasswordRequired {
            file_name: "locked.pdf".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"kind\":\"password_required\""), "got: {json}");
        let back: ExtractionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn invalid_pattern_display() {
        let e = TranscriptError::InvalidPattern {
            institution: "xyz".into(),
            pattern: "(".into(),
            detail: "unclosed group".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("xyz"));
        assert!(msg.contains("unclosed group"));
    }

    #[test]
    fn invalid_config_display() {
        let e = TranscriptError::InvalidConfig("concurrency must be ≥ 1".into());
        assert!(e.to_string().starts_with("Invalid configuration"));
    }
}
