//! Anthropic Messages API judge client.
//!
//! The output schema is enforced with a single forced tool: the request
//! declares `record_judgement` with the schema as its `input_schema` and sets
//! `tool_choice` to it. The tool input, serialised as JSON, is the payload
//! handed back to the scoring engine.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::JudgeConfig;
use crate::domain::ports::{JudgeClient, JudgeRequest, JudgeResponse};

/// Name of the tool the judge is forced to call.
pub const JUDGEMENT_TOOL: &str = "record_judgement";

/// Configuration for the Anthropic judge client.
#[derive(Debug, Clone)]
pub struct AnthropicJudgeConfig {
    /// API key (will be read from ANTHROPIC_API_KEY env if not set).
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AnthropicJudgeConfig {
    fn default() -> Self {
        Self::from(&JudgeConfig::default())
    }
}

impl From<&JudgeConfig> for AnthropicJudgeConfig {
    fn from(config: &JudgeConfig) -> Self {
        Self {
            api_key: None,
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl AnthropicJudgeConfig {
    /// Get API key from config or environment.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Message role in Anthropic API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Content block in a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub choice_type: String,
    pub name: String,
}

/// Request to the Anthropic Messages API.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
}

/// Usage information from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Response from the Anthropic Messages API.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// Anthropic Messages API judge.
pub struct AnthropicJudgeClient {
    config: AnthropicJudgeConfig,
    api_key: String,
    client: Client,
}

impl AnthropicJudgeClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: AnthropicJudgeConfig) -> DomainResult<Self> {
        let api_key = config
            .get_api_key()
            .ok_or_else(|| DomainError::ValidationFailed("ANTHROPIC_API_KEY not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ValidationFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Build the Messages API request from a judge request.
    pub fn build_request(request: &JudgeRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            system: (!request.system_prompt.is_empty()).then(|| request.system_prompt.clone()),
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text {
                    text: request.user_prompt.clone(),
                }],
            }],
            temperature: request.temperature,
            tools: vec![ToolDefinition {
                name: JUDGEMENT_TOOL.to_string(),
                description: "Record your judgement in the required structure.".to_string(),
                input_schema: request.output_schema.clone(),
            }],
            tool_choice: ToolChoice {
                choice_type: "tool".to_string(),
                name: JUDGEMENT_TOOL.to_string(),
            },
        }
    }

    /// Tool input as JSON, or the concatenated text blocks if the model did not call the tool.
    fn extract_payload(response: &MessagesResponse) -> String {
        let tool_input = response.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == JUDGEMENT_TOOL => Some(input),
            _ => None,
        });

        if let Some(input) = tool_input {
            return input.to_string();
        }

        response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl JudgeClient for AnthropicJudgeClient {
    fn name(&self) -> &'static str {
        "anthropic_api"
    }

    async fn invoke(&self, request: JudgeRequest) -> DomainResult<JudgeResponse> {
        let api_request = Self::build_request(&request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| DomainError::JudgeFailed(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::JudgeFailed(format!("API error {}: {}", status, body)));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::JudgeFailed(format!("Failed to parse response: {}", e)))?;

        debug!(
            model = %result.model,
            stop_reason = ?result.stop_reason,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            "Judge call completed"
        );

        Ok(JudgeResponse::new(
            Self::extract_payload(&result),
            result.usage.input_tokens,
            result.usage.output_tokens,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn judge_request() -> JudgeRequest {
        JudgeRequest {
            model: "claude-test".to_string(),
            system_prompt: "rubric".to_string(),
            user_prompt: "claim".to_string(),
            output_schema: json!({ "type": "object" }),
            max_tokens: 256,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_request_forces_judgement_tool() {
        let body = serde_json::to_value(AnthropicJudgeClient::build_request(&judge_request())).unwrap();
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert_eq!(body["tool_choice"]["name"], JUDGEMENT_TOOL);
        assert_eq!(body["tools"][0]["input_schema"], json!({ "type": "object" }));
        assert_eq!(body["system"], "rubric");
        assert_eq!(body["messages"][0]["content"][0]["text"], "claim");
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let mut request = judge_request();
        request.system_prompt.clear();
        let body = serde_json::to_value(AnthropicJudgeClient::build_request(&request)).unwrap();
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_payload_prefers_tool_input() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude-test",
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 10, "output_tokens": 5 },
            "content": [
                { "type": "text", "text": "thinking" },
                { "type": "tool_use", "id": "t1", "name": JUDGEMENT_TOOL, "input": { "score": 4 } }
            ]
        }))
        .unwrap();
        assert_eq!(AnthropicJudgeClient::extract_payload(&response), r#"{"score":4}"#);
    }

    #[test]
    fn test_missing_key_is_validation_error() {
        temp_env::with_var_unset("ANTHROPIC_API_KEY", || {
            let result = AnthropicJudgeClient::new(AnthropicJudgeConfig::default());
            assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
        });
    }
}
