//! Judge client port - interface for the external judge model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::TokenUsage;

/// A single structured judge invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// JSON schema the response payload must follow.
    pub output_schema: serde_json::Value,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Raw judge reply. The payload is untrusted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl JudgeResponse {
    pub fn new(text: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            text: text.into(),
            input_tokens,
            output_tokens,
        }
    }

    pub fn usage(&self) -> TokenUsage {
        TokenUsage::new(self.input_tokens, self.output_tokens)
    }
}

/// Trait for judge model backends.
///
/// Implementations perform one round trip per call and never retry; retries
/// in this crate are semantic (regeneration, direct correction), not transport-level.
/// Transport and provider failures surface as `DomainError::JudgeFailed`.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    async fn invoke(&self, request: JudgeRequest) -> DomainResult<JudgeResponse>;
}
