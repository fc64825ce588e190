//! LLM orchestration: provider contract, prompt construction, output
//! interpretation, and the analysis service built on top of them.

pub mod output;
pub mod prompts;
pub mod providers;
pub mod service;

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use output::ModelOutput;
pub use providers::build_provider;
pub use service::{AnalysisMode, AnalysisOutcome, LlmService, OrchestratorConfig};

/// Per-call confidence reported by every provider.
///
/// This is a fixed placeholder kept for response compatibility. It is not
/// derived from the model's output and carries no statistical meaning.
pub const PLACEHOLDER_CALL_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    /// Self-hosted server speaking the OpenAI chat-completions protocol
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Local => "local",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4",
            ProviderKind::Anthropic => "claude-3-sonnet-20240229",
            ProviderKind::Local => "llama3",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Local => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "local" => Ok(ProviderKind::Local),
            other => Err(Error::Config(format!("unknown provider: {other}"))),
        }
    }
}

/// One prompt to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Normalized completion result, identical in shape across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub provider: ProviderKind,
    pub model: String,
    pub tokens_used: u64,
    /// Wall-clock time around the remote call
    pub processing_time_ms: u64,
    /// Always [`PLACEHOLDER_CALL_CONFIDENCE`]
    pub confidence: f64,
}

/// Uniform call contract for LLM backends.
///
/// Implementations validate credentials at construction and map every
/// remote failure to `ProviderCallFailed` (or `ProviderTimeout`). They never
/// retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" local ".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert!("bedrock".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde_matches_display() {
        for kind in [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Local] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
