//! Document Preprocessors
//!
//! Converts raw documents into `ExtractedContent`, the unified input for
//! classification and scoring.
//!
//! ## Architecture
//!
//! ```text
//! PDF bytes / path
//!     ↓
//! [PdfPreprocessor] ── PdfBackend (lopdf) + TableExtractor
//!     ↓
//! ExtractedContent
//!     ↓
//! [DocumentProcessor] ── classify, score
//!     ↓
//! ParsedDocument
//! ```

pub mod pdf;
pub mod preprocessor;

// Re-export main types
pub use pdf::{LopdfBackend, PdfBackend, PdfBackendImpl, PdfPreprocessor, TableExtractor};
pub use preprocessor::Preprocessor;
