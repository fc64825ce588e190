use super::openai::ChatCompletions;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::llm::{LlmProvider, LlmRequest, LlmResponse, ProviderKind};
use async_trait::async_trait;

/// Self-hosted OpenAI-compatible server (Ollama, llama.cpp, vLLM).
///
/// A key is sent only when one is configured.
pub struct LocalProvider {
    client: ChatCompletions,
}

impl LocalProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.api_key().map(str::to_string);
        Ok(Self {
            client: ChatCompletions::new(config, api_key)?,
        })
    }
}

#[async_trait]
impl LlmProvider for LocalProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.client.complete(request).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn model(&self) -> &str {
        self.client.model()
    }
}
