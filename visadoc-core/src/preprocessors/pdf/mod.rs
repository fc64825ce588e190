//! PDF Preprocessor
//!
//! Main preprocessor for PDF documents. A pluggable backend extracts text,
//! widgets and images; a separate table extractor runs over the page text.

pub mod backends;
pub mod tables;

use crate::error::{Error, Result};
use crate::preprocessors::preprocessor::Preprocessor;
use crate::types::ExtractedContent;
use std::path::Path;

pub use backends::{LopdfBackend, PdfBackend};
pub use tables::TableExtractor;

/// Backend enum for runtime backend selection
pub enum PdfBackendImpl {
    Lopdf(LopdfBackend),
}

impl Default for PdfBackendImpl {
    fn default() -> Self {
        PdfBackendImpl::Lopdf(LopdfBackend::new())
    }
}

impl PdfBackend for PdfBackendImpl {
    fn extract(&self, pdf_bytes: &[u8]) -> anyhow::Result<ExtractedContent> {
        match self {
            PdfBackendImpl::Lopdf(backend) => backend.extract(pdf_bytes),
        }
    }

    fn name(&self) -> &str {
        match self {
            PdfBackendImpl::Lopdf(backend) => backend.name(),
        }
    }

    fn is_healthy(&self) -> bool {
        match self {
            PdfBackendImpl::Lopdf(backend) => backend.is_healthy(),
        }
    }
}

/// PDF Preprocessor with pluggable backend
///
/// Processes PDF documents through two stages:
/// 1. Backend extraction: PDF bytes → text, widgets, images
/// 2. Table detection over the page text (best-effort)
pub struct PdfPreprocessor {
    backend: PdfBackendImpl,
    /// `None` disables table detection
    tables: Option<TableExtractor>,
}

impl Default for PdfPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfPreprocessor {
    /// lopdf backend with the default table detector
    pub fn new() -> Self {
        Self {
            backend: PdfBackendImpl::default(),
            tables: Some(TableExtractor::default()),
        }
    }

    pub fn with_backend(backend: PdfBackendImpl) -> Self {
        Self {
            backend,
            tables: Some(TableExtractor::default()),
        }
    }

    pub fn with_table_extractor(mut self, tables: Option<TableExtractor>) -> Self {
        self.tables = tables;
        self
    }

    /// Get the backend name for logging
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Check if the backend is healthy
    pub fn is_healthy(&self) -> bool {
        self.backend.is_healthy()
    }
}

impl Preprocessor for PdfPreprocessor {
    fn process(&self, pdf_bytes: &[u8]) -> Result<ExtractedContent> {
        let mut content = self
            .backend
            .extract(pdf_bytes)
            .map_err(|e| Error::DocumentUnreadable(format!("{e:#}")))?;

        if let Some(extractor) = &self.tables {
            content.tables = extractor.extract(&content.pages_text).unwrap_or_else(|e| {
                let reason = format!("{e:#}");
                tracing::warn!(error = %reason, "table extraction failed, continuing without tables");
                Vec::new()
            });
        }

        tracing::debug!(
            backend = self.backend_name(),
            pages = content.pages_text.len(),
            fields = content.form_fields.len(),
            tables = content.tables.len(),
            images = content.images_info.len(),
            "pdf extracted"
        );

        Ok(content)
    }

    fn name(&self) -> &str {
        "PdfPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_supports_only_pdf_extension() {
        let preprocessor = PdfPreprocessor::new();
        assert!(preprocessor.supports_file_type(Path::new("i-130.pdf")));
        assert!(preprocessor.supports_file_type(Path::new("SCAN.PDF")));
        assert!(!preprocessor.supports_file_type(Path::new("notes.txt")));
        assert!(!preprocessor.supports_file_type(Path::new("pdf")));
    }

    #[test]
    fn test_corrupt_bytes_are_unreadable() {
        let err = PdfPreprocessor::new().process(b"definitely not a pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocumentUnreadable);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PdfPreprocessor::new()
            .process_file(Path::new("/nonexistent/form.pdf"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
