//! PDF text extraction.
//!
//! The pipeline hands this module raw bytes plus the declared content type
//! and gets back plain UTF-8 text. Failure modes are typed and distinct: a
//! non-PDF file signature, a structurally broken document, and a document
//! with no extractable text are three different outcomes, and none of them
//! is ever collapsed into an empty string.

use std::fmt;

/// MIME type accepted for extraction.
pub const MIME_PDF: &str = "application/pdf";

/// Leading bytes of every well-formed PDF.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extraction failure. `Malformed` and `Empty` finalize a record at
/// `parse_failed`; the other variants are caught by upload validation
/// before extraction normally runs.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    BadSignature,
    Malformed(String),
    Empty,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::BadSignature => write!(f, "file signature does not match a PDF"),
            ExtractError::Malformed(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "no text content found in file"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Text extraction capability.
///
/// The production implementation wraps a PDF parser. Keeping this behind a
/// trait lets tests substitute canned or failing extractors and drive the
/// pipeline's failure transitions deterministically.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ExtractError>;
}

/// Whether the declared content type is `application/pdf`, ignoring case
/// and any parameters (`application/pdf; charset=binary`).
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .eq_ignore_ascii_case(MIME_PDF)
}

/// Whether the bytes begin with the `%PDF-` signature.
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
        if !is_pdf_content_type(content_type) {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }
        if !has_pdf_signature(bytes) {
            return Err(ExtractError::BadSignature);
        }
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Malformed(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text)
    }
}
