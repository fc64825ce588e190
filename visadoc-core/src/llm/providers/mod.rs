//! Provider adapters, one per backend, selected once at construction.

pub mod anthropic;
pub mod local;
pub mod openai;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmProvider, ProviderKind};
use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use local::LocalProvider;
pub use openai::OpenAiProvider;

/// Longest slice of an error body quoted in `ProviderCallFailed`.
const ERROR_BODY_PREVIEW: usize = 300;

pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderKind::Local => Arc::new(LocalProvider::new(config)?),
    };
    tracing::info!(provider = %provider.kind(), model = provider.model(), "llm provider ready");
    Ok(provider)
}

pub(crate) fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| Error::ProviderUnavailable {
            provider: config.kind.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

pub(crate) fn require_api_key(config: &ProviderConfig) -> Result<String> {
    config
        .api_key()
        .map(str::to_string)
        .ok_or_else(|| Error::ProviderUnavailable {
            provider: config.kind.to_string(),
            reason: "API key not configured".to_string(),
        })
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send a JSON POST and return the body of a successful response.
pub(crate) async fn post_json(
    kind: ProviderKind,
    request: reqwest::RequestBuilder,
    timeout: std::time::Duration,
) -> Result<String> {
    let provider = kind.to_string();
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::ProviderTimeout {
                provider: provider.clone(),
                timeout,
            }
        } else {
            Error::ProviderCallFailed {
                provider: provider.clone(),
                message: format!("request failed: {e}"),
            }
        }
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| Error::ProviderCallFailed {
        provider: provider.clone(),
        message: format!("failed to read response body: {e}"),
    })?;

    if !status.is_success() {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        return Err(Error::ProviderCallFailed {
            provider,
            message: format!("API error ({status}): {preview}"),
        });
    }

    Ok(body)
}
