//! PDF Backend trait
//!
//! Defines the interface that all PDF extraction backends must implement.
//! Every backend produces the same `ExtractedContent` with tables left empty;
//! table detection runs separately over the page text.

use crate::types::ExtractedContent;
use anyhow::Result;

/// Backend trait for PDF extraction
///
/// Implementations fill metadata (except `file_size`), per-page text, form
/// widgets, and the image inventory. Errors are plain `anyhow` errors; the
/// preprocessor maps them to `DocumentUnreadable`.
pub trait PdfBackend: Send + Sync {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedContent>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;

    fn is_healthy(&self) -> bool;
}

pub mod lopdf_backend;

pub use lopdf_backend::LopdfBackend;
