use crate::classifier::DocumentClassifier;
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::preprocessors::{PdfPreprocessor, Preprocessor, TableExtractor};
use crate::scoring::parsing_confidence;
use crate::types::*;
use std::path::Path;
use std::time::{Duration, Instant};

/// How far into the input the `%PDF-` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        tracing::info!(step = step_name, elapsed_ms = elapsed.as_millis() as u64, "step finished");
        self.timings.push((step_name.to_string(), elapsed));

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            let share = format!("{percentage:.1}%");
            tracing::info!(
                step = %step,
                elapsed_ms = duration.as_millis() as u64,
                share = %share,
                "profile"
            );
        }
        tracing::info!(total_ms = total.as_millis() as u64, "profile total");
    }
}

/// Drives validate → extract → classify → score for one upload.
pub struct DocumentProcessor {
    preprocessor: Box<dyn Preprocessor + Send + Sync>,
    classifier: DocumentClassifier,
    max_file_size: u64,
    profile_steps: bool,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        preprocessor: Box<dyn Preprocessor + Send + Sync>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            preprocessor,
            classifier: DocumentClassifier::new(),
            max_file_size: config.max_file_size_bytes,
            profile_steps: config.profile_steps,
        }
    }

    /// lopdf-backed processor configured from the `extraction` section
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let tables = config
            .detect_tables
            .then(|| TableExtractor::new(&config.table_cell_separator));
        let preprocessor = PdfPreprocessor::new().with_table_extractor(tables);
        Self::new_with_dependencies(Box::new(preprocessor), config)
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Parse an in-memory upload. `file_name`, when known, must end in `.pdf`.
    pub fn parse_bytes(&self, pdf_bytes: &[u8], file_name: Option<&str>) -> Result<ParsedDocument> {
        if let Some(name) = file_name {
            check_extension(name)?;
        }
        self.check_size(pdf_bytes.len() as u64)?;
        check_header(pdf_bytes)?;

        let mut profiler = StepProfiler::new(self.profile_steps);

        let content = profiler.time_step("Extraction", || self.preprocessor.process(pdf_bytes))?;
        let document_type =
            profiler.time_step("Classification", || self.classifier.classify(&content.full_text));
        let confidence_score = profiler.time_step("Scoring", || {
            parsing_confidence(&content.full_text, &content.form_fields, &content.tables)
        });

        profiler.log_summary();

        let ExtractedContent {
            mut metadata,
            full_text,
            pages_text,
            form_fields,
            tables,
            images_info,
        } = content;
        metadata.file_size = pdf_bytes.len() as u64;

        tracing::info!(
            file = file_name.unwrap_or("<bytes>"),
            document_type = %document_type,
            confidence = confidence_score,
            pages = metadata.page_count,
            fields = form_fields.len(),
            tables = tables.len(),
            images = images_info.len(),
            "document parsed"
        );

        Ok(ParsedDocument {
            metadata,
            full_text,
            pages_text,
            form_fields,
            tables,
            images_info,
            document_type,
            confidence_score,
        })
    }

    /// Parse a PDF from disk. The size limit is checked before reading.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedDocument> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        check_extension(file_name)?;
        self.check_size(std::fs::metadata(path)?.len())?;

        let pdf_bytes = std::fs::read(path)?;
        self.parse_bytes(&pdf_bytes, Some(file_name))
    }

    /// Whether `path` opens as a PDF with at least one page.
    pub fn validate_pdf(&self, path: &Path) -> bool {
        let Ok(pdf_bytes) = std::fs::read(path) else {
            return false;
        };
        if check_header(&pdf_bytes).is_err() {
            return false;
        }
        match self.preprocessor.process(&pdf_bytes) {
            Ok(content) => content.metadata.page_count > 0,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "pdf validation failed");
                false
            }
        }
    }

    pub fn classify_text(&self, text: &str) -> DocumentType {
        self.classifier.classify(text)
    }

    pub fn document_summary(doc: &ParsedDocument) -> DocumentSummary {
        doc.summary()
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

fn check_extension(file_name: &str) -> Result<()> {
    let is_pdf = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(format!(
            "only PDF files are supported, got {file_name:?}"
        )))
    }
}

fn check_header(pdf_bytes: &[u8]) -> Result<()> {
    let window = &pdf_bytes[..pdf_bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(Error::UnsupportedFormat(
            "no PDF header found".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_rejects_non_pdf_name_before_parsing() {
        let processor = DocumentProcessor::default();
        let err = processor.parse_bytes(b"%PDF-1.7", Some("photo.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_rejects_bytes_without_header() {
        let processor = DocumentProcessor::default();
        let err = processor
            .parse_bytes(b"PK\x03\x04 zipped docx", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_header_may_follow_leading_junk() {
        let mut bytes = vec![b' '; 100];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(check_header(&bytes).is_ok());
    }

    #[test]
    fn test_size_limit_checked_first() {
        let config = ExtractionConfig {
            max_file_size_bytes: 8,
            ..ExtractionConfig::default()
        };
        let processor = DocumentProcessor::from_config(&config);
        let err = processor
            .parse_bytes(b"%PDF-1.4 twelve+ bytes", Some("form.pdf"))
            .unwrap_err();
        match err {
            Error::FileTooLarge { size, limit } => {
                assert_eq!(limit, 8);
                assert!(size > 8);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_pdf_is_unreadable() {
        let processor = DocumentProcessor::default();
        let err = processor
            .parse_bytes(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog", Some("form.pdf"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DocumentUnreadable);
    }

    #[test]
    fn test_validate_pdf_false_for_missing_file() {
        let processor = DocumentProcessor::default();
        assert!(!processor.validate_pdf(Path::new("/nonexistent/i-485.pdf")));
    }

    #[test]
    fn test_profiler_disabled_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        let value = profiler.time_step("Extraction", || 42);
        assert_eq!(value, 42);
        assert!(profiler.timings().is_empty());

        let mut profiler = StepProfiler::new(true);
        profiler.time_step("Extraction", || ());
        profiler.time_step("Scoring", || ());
        let steps: Vec<_> = profiler.timings().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(steps, vec!["Extraction", "Scoring"]);
    }
}
