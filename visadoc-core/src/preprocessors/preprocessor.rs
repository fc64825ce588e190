// Preprocessor abstraction for document extraction
//
// This module defines the boundary between raw document parsing (PDF bytes ->
// ExtractedContent) and everything that interprets the content (classification,
// scoring, prompting).

use crate::error::Result;
use crate::types::ExtractedContent;
use std::path::Path;

/// Preprocessor trait - converts document bytes to `ExtractedContent`
///
/// Byte and path inputs go through the same code path: `process_file` only
/// reads the file and hands the bytes to `process`.
pub trait Preprocessor {
    /// Extract text, form fields, tables and images from an in-memory document.
    ///
    /// Fails with `DocumentUnreadable` when the document cannot be decoded;
    /// never returns partial content in that case.
    fn process(&self, pdf_bytes: &[u8]) -> Result<ExtractedContent>;

    /// Convenience method: Process from file path
    fn process_file(&self, input: &Path) -> Result<ExtractedContent> {
        let pdf_bytes = std::fs::read(input)?;
        self.process(&pdf_bytes)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
