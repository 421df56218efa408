//! Input handling: the [`Document`] handle and its [`DocumentKind`].
//!
//! A document is classified by its media type (supplied by the caller or
//! guessed from the file name) and its extension. PDF wins over text so a
//! mislabelled `.pdf` still goes through the PDF path and fails with a
//! meaningful `NotAPdf` instead of being decoded as garbage text.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// How the Text Extractor treats a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Plain or delimited text, decoded as UTF-8.
    Text,
    /// Paged document with a text layer.
    Pdf,
    /// Anything else; only the file name is used.
    Binary,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Text => "text",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Binary => "binary",
        })
    }
}

/// An in-memory document plus the name it was uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    /// Caller-supplied media type; guessed from `file_name` when `None`.
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// The supplied media type, else the one registered for the extension.
    pub fn effective_media_type(&self) -> Option<String> {
        self.media_type.clone().or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        })
    }

    pub fn kind(&self) -> DocumentKind {
        classify_kind(&self.file_name, self.effective_media_type().as_deref())
    }

    /// Read a document from disk, enforcing `max_bytes` before reading.
    ///
    /// The file name recorded is the final path component.
    pub async fn read(path: &Path, max_bytes: u64) -> Result<Self, ExtractionError> {
        let file_name = file_name_of(path);
        let unreadable = |e: std::io::Error| ExtractionError::Unreadable {
            file_name: file_name.clone(),
            detail: e.to_string(),
        };

        let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
        if !meta.is_file() {
            return Err(ExtractionError::Unreadable {
                file_name,
                detail: "not a regular file".into(),
            });
        }
        if meta.len() > max_bytes {
            return Err(ExtractionError::TooLarge {
                file_name,
                size: meta.len(),
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Self::new(file_name, bytes))
    }
}

/// Final path component, lossily converted; the whole path if it has none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Decide the kind from a file name and an optional media type.
pub fn classify_kind(file_name: &str, media_type: Option<&str>) -> DocumentKind {
    let media = media_type
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if media == "application/pdf" || ext == "pdf" {
        DocumentKind::Pdf
    } else if media.starts_with("text/") || ext == "txt" || ext == "csv" {
        DocumentKind::Text
    } else {
        DocumentKind::Binary
    }
}
