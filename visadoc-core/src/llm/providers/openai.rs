use super::{endpoint, http_client, post_json, require_api_key};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmProvider, LlmRequest, LlmResponse, ProviderKind, PLACEHOLDER_CALL_CONFIDENCE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// Shared client for any server speaking the chat-completions protocol.
pub(crate) struct ChatCompletions {
    kind: ProviderKind,
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    system_prompt: String,
    timeout: Duration,
}

impl ChatCompletions {
    pub(crate) fn new(config: &ProviderConfig, api_key: Option<String>) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(config.kind.default_base_url());
        Ok(Self {
            kind: config.kind,
            http: http_client(config)?,
            url: endpoint(base_url, "chat/completions"),
            api_key,
            model: config.model_or_default(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            timeout: config.timeout(),
        })
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let started = Instant::now();
        let raw = post_json(self.kind, builder, self.timeout).await?;
        let elapsed = started.elapsed();

        let (content, tokens_used) =
            parse_chat_response(&raw).map_err(|message| Error::ProviderCallFailed {
                provider: self.kind.to_string(),
                message,
            })?;

        Ok(LlmResponse {
            content,
            provider: self.kind,
            model: self.model.clone(),
            tokens_used,
            processing_time_ms: elapsed.as_millis() as u64,
            confidence: PLACEHOLDER_CALL_CONFIDENCE,
        })
    }
}

/// Extract the first choice's text and the total token count.
pub(crate) fn parse_chat_response(raw: &str) -> std::result::Result<(String, u64), String> {
    let response: ChatResponse =
        serde_json::from_str(raw).map_err(|e| format!("malformed response body: {e}"))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| "response contained no choices".to_string())?;
    let tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0);
    Ok((content, tokens))
}

/// OpenAI chat completions with a bearer key.
pub struct OpenAiProvider {
    client: ChatCompletions,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = require_api_key(config)?;
        Ok(Self {
            client: ChatCompletions::new(config, Some(api_key))?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        self.client.complete(request).await
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> &str {
        self.client.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_choice_and_usage() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "File Form I-130 first."}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 90, "completion_tokens": 12, "total_tokens": 102}
        }"#;
        let (content, tokens) = parse_chat_response(raw).unwrap();
        assert_eq!(content, "File Form I-130 first.");
        assert_eq!(tokens, 102);
    }

    #[test]
    fn test_missing_usage_counts_zero() {
        let raw = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        assert_eq!(parse_chat_response(raw).unwrap(), ("ok".to_string(), 0));
    }

    #[test]
    fn test_empty_choices_is_failure() {
        assert!(parse_chat_response(r#"{"choices": []}"#).is_err());
        assert!(parse_chat_response("<html>gateway</html>").is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            max_tokens: 300,
            temperature: 0.3,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 300);
    }

    #[test]
    fn test_uses_configured_model_and_key() {
        let config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..ProviderConfig::default()
        };
        let provider = OpenAiProvider::new(&config).unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.kind(), ProviderKind::OpenAi);
    }
}
