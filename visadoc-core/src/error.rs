//! Error taxonomy for the core library.
//!
//! Every public operation returns [`Result`]. Each variant maps to a stable
//! [`ErrorKind`] so a request layer can report failures without leaking
//! internal state.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The PDF could not be opened or decoded.
    #[error("document unreadable: {0}")]
    DocumentUnreadable(String),

    /// Input was rejected before reaching the extractor.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("invalid chunk configuration: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunkConfig { chunk_size: usize, overlap: usize },

    /// Credentials or endpoint for the configured provider are missing.
    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("provider {provider} call failed: {message}")]
    ProviderCallFailed { provider: String, message: String },

    #[error("provider {provider} did not respond within {timeout:?}")]
    ProviderTimeout { provider: String, timeout: Duration },

    /// Expected-JSON output could not be decoded. Recovered inside the
    /// orchestrator; only surfaced by the low-level decode helpers.
    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, serializable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DocumentUnreadable,
    UnsupportedFormat,
    FileTooLarge,
    InvalidChunkConfig,
    ProviderUnavailable,
    ProviderCallFailed,
    ProviderTimeout,
    MalformedModelOutput,
    Cancelled,
    Config,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DocumentUnreadable(_) => ErrorKind::DocumentUnreadable,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Error::InvalidChunkConfig { .. } => ErrorKind::InvalidChunkConfig,
            Error::ProviderUnavailable { .. } => ErrorKind::ProviderUnavailable,
            Error::ProviderCallFailed { .. } => ErrorKind::ProviderCallFailed,
            Error::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            Error::MalformedModelOutput(_) => ErrorKind::MalformedModelOutput,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether a caller could reasonably retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ProviderCallFailed { .. } | Error::ProviderTimeout { .. }
        )
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

/// User-facing error body: a stable kind plus a readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        // I/O messages can carry local paths
        let message = match err {
            Error::Io(_) => "failed to read input".to_string(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind(),
            message,
        }
    }
}
