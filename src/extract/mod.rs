//! Text Extraction Module
//!
//! Converts raw attachment bytes into plain text for classification.
//!
//! ## Supported Formats
//! - PDF: Text extraction via pdf-extract
//! - Excel: .xlsx, .xls via calamine
//! - Word: .docx via docx-rs
//! - Text: .txt, .md, .csv, .log, .json, .xml, .html (direct read)
//!
//! Dispatch is by [`DocumentFormat`], a closed set of tags derived from the
//! file extension. Anything else is rejected with
//! [`ExtractionFailure::UnsupportedFormat`].

pub mod document_parser;

pub use document_parser::DocumentParser;

use serde::Serialize;

use crate::models::Document;

/// Why text could not be extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionFailure {
    /// No extraction strategy exists for this file type
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },
    /// The file could not be parsed as its declared format
    #[error("corrupt {format} source: {reason}")]
    CorruptSource { format: String, reason: String },
    /// The file parsed but contained no text (zero bytes, image-only, blank)
    #[error("document contains no extractable text")]
    EmptyContent,
}

/// Supported document formats, one extraction strategy each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Xls,
    PlainText,
}

impl DocumentFormat {
    /// Map a file extension to a format tag (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "txt" | "md" | "csv" | "log" | "json" | "xml" | "html" | "htm" => {
                Some(Self::PlainText)
            }
            _ => None,
        }
    }

    /// Resolve the format of a document, or the failure to report
    pub fn detect(document: &Document) -> Result<Self, ExtractionFailure> {
        let ext = document.extension().unwrap_or_default();
        Self::from_extension(&ext).ok_or(ExtractionFailure::UnsupportedFormat {
            extension: if ext.is_empty() { "<none>".to_string() } else { ext },
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::PlainText => "text",
        }
    }
}

/// Converts a loaded document into plain text
pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<String, ExtractionFailure>;
}
