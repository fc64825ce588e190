// VisaDoc Core Library
//
// Parses immigration PDF forms into structured documents and drives LLM
// analyses over them through pluggable provider adapters.

pub mod types;
pub mod error;
pub mod preprocessors;
pub mod processor;
pub mod classifier;
pub mod scoring;
pub mod chunker;
pub mod config;
pub mod storage;
pub mod llm;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use preprocessors::{PdfPreprocessor, Preprocessor};
pub use processor::DocumentProcessor;
pub use classifier::{classify, DocumentClassifier};
pub use chunker::{extract_text_chunks, TextChunker};
pub use config::ServiceConfig;
pub use storage::{DocumentStore, InMemoryStore};
pub use llm::{
    build_provider, AnalysisMode, AnalysisOutcome, LlmProvider, LlmRequest, LlmResponse,
    LlmService, ModelOutput, OrchestratorConfig, ProviderKind,
};
