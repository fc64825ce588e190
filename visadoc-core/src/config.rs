use crate::error::{Error, Result};
use crate::llm::ProviderKind;
use crate::preprocessors::pdf::tables::DEFAULT_CELL_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert immigration assistant. Provide accurate, helpful information based on the provided documents.";

/// Top-level service configuration, usually loaded from `visadoc.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub prompts: PromptBudgets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Uploads larger than this are rejected before parsing
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Run the text-layout table detector
    #[serde(default = "default_true")]
    pub detect_tables: bool,
    /// Regex splitting a text line into table cells
    #[serde(default = "default_cell_separator")]
    pub table_cell_separator: String,
    /// Log per-step timings at info level
    #[serde(default)]
    pub profile_steps: bool,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_true() -> bool {
    true
}

fn default_cell_separator() -> String {
    DEFAULT_CELL_SEPARATOR.to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            detect_tables: true,
            table_cell_separator: default_cell_separator(),
            profile_steps: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Everything needed to construct one provider adapter.
///
/// Credentials are plain fields; the core never reads the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// Falls back to the provider's default model when empty
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: String::new(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured model, or the provider's default when unset.
    pub fn model_or_default(&self) -> String {
        if self.model.trim().is_empty() {
            self.kind.default_model().to_string()
        } else {
            self.model.clone()
        }
    }

    /// API key with surrounding whitespace removed; blank keys count as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Per-prompt input (characters of document text) and output (max tokens) budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptBudgets {
    pub summary: PromptBudget,
    pub key_info: PromptBudget,
    /// Field guidance sends only the field descriptor, so `input_chars` is unused
    pub field_guidance: PromptBudget,
    pub recommendations: PromptBudget,
    pub answer: PromptBudget,
    pub translate: PromptBudget,
    pub simplify: PromptBudget,
    pub faq: PromptBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBudget {
    pub input_chars: usize,
    pub max_tokens: u32,
}

impl PromptBudget {
    pub const fn new(input_chars: usize, max_tokens: u32) -> Self {
        Self {
            input_chars,
            max_tokens,
        }
    }
}

impl Default for PromptBudgets {
    fn default() -> Self {
        Self {
            summary: PromptBudget::new(4000, 1000),
            key_info: PromptBudget::new(3000, 800),
            field_guidance: PromptBudget::new(0, 300),
            recommendations: PromptBudget::new(2000, 600),
            answer: PromptBudget::new(3000, 400),
            translate: PromptBudget::new(3000, 1000),
            simplify: PromptBudget::new(3000, 1000),
            faq: PromptBudget::new(2000, 800),
        }
    }
}

impl ServiceConfig {
    /// Load config from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ServiceConfig =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to defaults when the file is missing or invalid
    pub fn load_with_fallback<P: AsRef<Path>>(path: Option<P>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p.as_ref()).unwrap_or_else(|e| {
                tracing::warn!(
                    path = %p.as_ref().display(),
                    error = %e,
                    "failed to load config, using defaults"
                );
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 || self.chunking.overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidChunkConfig {
                chunk_size: self.chunking.chunk_size,
                overlap: self.chunking.overlap,
            });
        }
        if self.extraction.max_file_size_bytes == 0 {
            return Err(Error::Config(
                "extraction.max_file_size_bytes must be positive".to_string(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(Error::Config(
                "provider.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_match_budgets() {
        let config = ServiceConfig::default();
        assert_eq!(config.extraction.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.prompts.summary, PromptBudget::new(4000, 1000));
        assert_eq!(config.prompts.faq.input_chars, 2000);
        assert_eq!(config.provider.temperature, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
provider:
  kind: anthropic
  timeout_secs: 15
chunking:
  chunk_size: 500
  overlap: 50
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Anthropic);
        assert_eq!(config.provider.timeout(), Duration::from_secs(15));
        assert_eq!(config.provider.model_or_default(), "claude-3-sonnet-20240229");
        assert_eq!(config.chunking.overlap, 50);
        assert!(config.extraction.detect_tables);
        assert_eq!(config.prompts.answer.max_tokens, 400);
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let yaml = "chunking:\n  chunk_size: 100\n  overlap: 100\n";
        let err = ServiceConfig::from_yaml(yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidChunkConfig);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = ServiceConfig::from_yaml("provider: [unterminated").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_fallback_on_missing_file() {
        let config = ServiceConfig::load_with_fallback(Some("/nonexistent/visadoc.yaml"));
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_blank_api_key_is_absent_and_redacted() {
        let mut provider = ProviderConfig {
            api_key: Some("   ".to_string()),
            ..ProviderConfig::default()
        };
        assert_eq!(provider.api_key(), None);

        provider.api_key = Some("sk-secret".to_string());
        assert_eq!(provider.api_key(), Some("sk-secret"));
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }
}
