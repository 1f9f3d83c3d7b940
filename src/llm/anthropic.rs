//! Anthropic messages-API client.

use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{ContentBlock, Message, ModelClient, ModelResponse, ToolDefinition, TransportError};
use crate::config::Config;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Opaque API credential. Only ever written into the request header.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Client for `POST /v1/messages`.
pub struct AnthropicClient {
    api_key: ApiKey,
    model: String,
    max_tokens: u32,
    base_url: String,
    system_prompt: Option<String>,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            max_tokens: 4096,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(config.api_key.clone(), config.model.clone())
            .with_max_tokens(config.max_tokens)
            .with_base_url(config.base_url.clone());
        client.system_prompt = config.system_prompt.clone();
        client
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// Build the JSON request body. `tools` is omitted entirely when `None`.
    fn build_request_body(&self, messages: &[Message], tools: Option<&[ToolDefinition]>) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });

        if let Some(tools) = tools {
            body["tools"] = json!(tools);
        }

        if let Some(ref system) = self.system_prompt {
            body["system"] = json!(system);
        }

        body
    }
}

/// Parse a successful response body into content blocks.
fn parse_response(body: Value) -> Result<ModelResponse, TransportError> {
    let content = match body.get("content") {
        Some(Value::Null) | None => {
            return Err(TransportError::MalformedResponse(
                "response has no 'content' field".to_string(),
            ))
        }
        Some(content) => content.clone(),
    };

    let content: Vec<ContentBlock> = serde_json::from_value(content)
        .map_err(|e| TransportError::MalformedResponse(format!("invalid content blocks: {}", e)))?;

    Ok(ModelResponse { content })
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn send(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ModelResponse, TransportError> {
        let body = self.build_request_body(messages, tools);

        debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Anthropic API request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        parse_response(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new(ApiKey::new("sk-test"), "claude-test")
    }

    #[test]
    fn body_omits_tools_when_none() {
        let body = client().build_request_body(&[Message::user("hi")], None);
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert!(body.get("tools").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn body_includes_tool_definitions_and_system() {
        let tools = vec![ToolDefinition {
            name: "get_time".to_string(),
            description: "Current time".to_string(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        }];
        let body = client()
            .with_system_prompt("be brief")
            .build_request_body(&[Message::user("hi")], Some(tools.as_slice()));
        assert_eq!(body["tools"][0]["name"], "get_time");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["system"], "be brief");
    }

    #[test]
    fn empty_tool_list_is_sent_as_empty_array() {
        let body = client().build_request_body(&[Message::user("hi")], Some(&[][..]));
        assert_eq!(body["tools"], json!([]));
    }

    #[test]
    fn from_config_carries_model_and_limits() {
        let mut config = Config::new("sk-test").with_model("claude-other");
        config.base_url = "http://localhost:9000/".to_string();
        let c = AnthropicClient::from_config(&config);
        assert_eq!(c.model(), "claude-other");
        assert_eq!(c.endpoint(), "http://localhost:9000/v1/messages");
        let body = c.build_request_body(&[Message::user("hi")], None);
        assert_eq!(body["model"], "claude-other");
        assert_eq!(body["max_tokens"], config.max_tokens);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = client().with_base_url("http://localhost:8080/");
        assert_eq!(c.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let body = json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_time", "input": {}}
            ],
            "stop_reason": "tool_use"
        });
        let response = parse_response(body).unwrap();
        assert_eq!(
            response.content,
            vec![
                ContentBlock::text("Let me check."),
                ContentBlock::tool_use("toolu_1", "get_time", json!({})),
            ]
        );
    }

    #[test]
    fn empty_content_array_is_legal() {
        let response = parse_response(json!({"content": []})).unwrap();
        assert!(response.content.is_empty());
    }

    #[test]
    fn missing_or_null_content_is_malformed() {
        assert!(matches!(
            parse_response(json!({})),
            Err(TransportError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(json!({"content": null})),
            Err(TransportError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(json!({"content": [{"type": "mystery"}]})),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-very-secret");
        assert!(!format!("{:?}", key).contains("sk-very-secret"));
    }
}
