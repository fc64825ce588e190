use super::{endpoint, http_client, post_json, require_api_key};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmProvider, LlmRequest, LlmResponse, ProviderKind, PLACEHOLDER_CALL_CONFIDENCE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Concatenated text blocks and input plus output tokens.
fn parse_messages_response(raw: &str) -> std::result::Result<(String, u64), String> {
    let response: MessagesResponse =
        serde_json::from_str(raw).map_err(|e| format!("malformed response body: {e}"))?;
    if response.content.is_empty() {
        return Err("response contained no content blocks".to_string());
    }
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    let tokens = response
        .usage
        .map(|u| u.input_tokens + u.output_tokens)
        .unwrap_or(0);
    Ok((text, tokens))
}

/// Anthropic Messages API.
pub struct AnthropicProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = require_api_key(config)?;
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(ProviderKind::Anthropic.default_base_url());
        Ok(Self {
            http: http_client(config)?,
            url: endpoint(base_url, "messages"),
            api_key,
            model: config.model_or_default(),
            temperature: config.temperature,
            system_prompt: config.system_prompt.clone(),
            timeout: config.timeout(),
        })
    }

    fn request_body<'a>(&'a self, request: &'a LlmRequest) -> MessagesRequest<'a> {
        let system = Some(self.system_prompt.trim()).filter(|s| !s.is_empty());
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: self.temperature,
            system,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let builder = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(request));

        let started = Instant::now();
        let raw = post_json(ProviderKind::Anthropic, builder, self.timeout).await?;
        let elapsed = started.elapsed();

        let (content, tokens_used) =
            parse_messages_response(&raw).map_err(|message| Error::ProviderCallFailed {
                provider: ProviderKind::Anthropic.to_string(),
                message,
            })?;

        Ok(LlmResponse {
            content,
            provider: ProviderKind::Anthropic,
            model: self.model.clone(),
            tokens_used,
            processing_time_ms: elapsed.as_millis() as u64,
            confidence: PLACEHOLDER_CALL_CONFIDENCE,
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(system_prompt: &str) -> AnthropicProvider {
        let config = ProviderConfig {
            kind: ProviderKind::Anthropic,
            api_key: Some("sk-ant-test".to_string()),
            system_prompt: system_prompt.to_string(),
            ..ProviderConfig::default()
        };
        AnthropicProvider::new(&config).unwrap()
    }

    #[test]
    fn test_parse_joins_text_blocks() {
        let raw = r#"{
            "id": "msg_01",
            "type": "message",
            "content": [
                {"type": "text", "text": "Part one. "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "Part two."}
            ],
            "usage": {"input_tokens": 40, "output_tokens": 9}
        }"#;
        let (text, tokens) = parse_messages_response(raw).unwrap();
        assert_eq!(text, "Part one. Part two.");
        assert_eq!(tokens, 49);
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        assert!(parse_messages_response(r#"{"content": []}"#).is_err());
        assert!(parse_messages_response("not json").is_err());
    }

    #[test]
    fn test_system_prompt_is_top_level() {
        let p = provider("You are an expert.");
        let request = LlmRequest::new("Summarize", 100);
        let json = serde_json::to_value(p.request_body(&request)).unwrap();
        assert_eq!(json["system"], "You are an expert.");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_blank_system_prompt_is_omitted() {
        let p = provider("  ");
        let request = LlmRequest::new("Summarize", 100);
        let json = serde_json::to_value(p.request_body(&request)).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_default_model_and_endpoint() {
        let p = provider("");
        assert_eq!(p.model(), "claude-3-sonnet-20240229");
        assert_eq!(p.url, "https://api.anthropic.com/v1/messages");
    }
}
