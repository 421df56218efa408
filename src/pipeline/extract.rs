//! Text extraction: turn a [`Document`] into [`ExtractedText`].
//!
//! ## Why always append the file name?
//!
//! Scanned transcripts and images have no text layer, and uploads are very
//! often named after the institution (`buet_transcript.png`). The file name
//! is therefore appended to every extraction result, empty or not, and is
//! frequently the only detection signal available.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. Page iteration runs on tokio's blocking pool so worker
//! threads keep serving other analyses.

use crate::config::AnalysisConfig;
use crate::error::ExtractionError;
use crate::pipeline::input::{Document, DocumentKind};
use pdfium_render::prelude::*;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Document text followed by `" " + file_name`.
///
/// Opaque to every downstream stage: nothing assumes any structure beyond
/// "a string that may contain newlines".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Join extracted body text with the file name.
    pub fn new(body: &str, file_name: &str) -> Self {
        Self(format!("{body} {file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for ExtractedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the text of `document` according to its kind.
///
/// Text documents are decoded as UTF-8 without any transformation; PDFs
/// contribute their text layer page by page; binary documents contribute
/// nothing. The file name is appended in every successful case.
pub async fn extract_text(
    document: Document,
    config: &AnalysisConfig,
) -> Result<ExtractedText, ExtractionError> {
    let size = document.bytes.len() as u64;
    if size > config.max_document_bytes {
        return Err(ExtractionError::TooLarge {
            file_name: document.file_name,
            size,
            limit: config.max_document_bytes,
        });
    }

    let kind = document.kind();
    let file_name = document.file_name.clone();
    let body = match kind {
        DocumentKind::Text => decode_text(document.bytes, &file_name, config.lossy_text)?,
        DocumentKind::Pdf => {
            check_pdf_magic(&document.bytes, &file_name)?;
            let password = config.password.clone();
            let lib_path = config.pdfium_library_path.clone();
            let name = file_name.clone();
            tokio::task::spawn_blocking(move || {
                pdf_text_blocking(
                    &document.bytes,
                    &name,
                    password.as_deref(),
                    lib_path.as_deref(),
                )
            })
            .await
            .map_err(|e| ExtractionError::Internal {
                detail: format!("PDF text task panicked: {e}"),
            })??
        }
        DocumentKind::Binary => String::new(),
    };

    debug!(
        "Extracted {} chars of {} text from {}",
        body.chars().count(),
        kind,
        file_name
    );
    Ok(ExtractedText::new(&body, &file_name))
}

/// Decode text bytes as UTF-8, optionally replacing invalid sequences.
pub fn decode_text(
    bytes: Vec<u8>,
    file_name: &str,
    lossy: bool,
) -> Result<String, ExtractionError> {
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) if lossy => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        Err(e) => Err(ExtractionError::InvalidText {
            file_name: file_name.to_string(),
            detail: e.utf8_error().to_string(),
        }),
    }
}

/// Reject documents claiming to be PDFs that lack the `%PDF` header.
pub fn check_pdf_magic(bytes: &[u8], file_name: &str) -> Result<(), ExtractionError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(ExtractionError::NotAPdf {
            file_name: file_name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfiumUnavailable {
                detail: format!("{}: {}", path.display(), e),
            }
        })?,
        None => Pdfium::bind_to_system_library().map_err(|e| {
            ExtractionError::PdfiumUnavailable {
                detail: format!("system library: {e}"),
            }
        })?,
    };
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of PDF text extraction.
fn pdf_text_blocking(
    bytes: &[u8],
    file_name: &str,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<String, ExtractionError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ExtractionError::WrongPassword {
                        file_name: file_name.to_string(),
                    }
                } else {
                    ExtractionError::PasswordRequired {
                        file_name: file_name.to_string(),
                    }
                }
            } else {
                ExtractionError::CorruptPdf {
                    file_name: file_name.to_string(),
                    detail: err_str,
                }
            }
        })?;

    let pages = document
        .pages()
        .iter()
        .enumerate()
        .map(|(idx, page)| -> Result<Vec<String>, ExtractionError> {
            let text = page.text().map_err(|e| ExtractionError::CorruptPdf {
                file_name: file_name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            Ok(text.segments().iter().map(|s| s.text()).collect())
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("PDF {}: {} pages of text", file_name, pages.len());
    Ok(join_pages(pages))
}

/// Join per-page text fragments: fragments separated by a space, every
/// page (including the last) followed by `\n`, in page order.
pub fn join_pages(pages: impl IntoIterator<Item = Vec<String>>) -> String {
    pages.into_iter().fold(String::new(), |mut out, fragments| {
        out.push_str(&fragments.join(" "));
        out.push('\n');
        out
    })
}
