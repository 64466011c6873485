//! Direct correction: one judge-backed rewrite of a failing message.
//!
//! Fails open. Any error, timeout or empty payload yields the original text
//! with zero token usage.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{FailedDimension, JudgeConfig, SimilarityResult, TokenUsage};
use crate::domain::ports::{JudgeClient, JudgeRequest};
use crate::services::response_parser::parse_json_payload;

pub const DEFAULT_CORRECTION_TIMEOUT: Duration = Duration::from_secs(5);

const CORRECTION_SYSTEM_PROMPT: &str = "\
You are an editor for a character in a multi-party conversation.
You rewrite the character's message so that it satisfies every rule you are given,
while keeping its intent and staying in character.
Respond with JSON only: {\"corrected_text\": <string>}.";

/// Context for a rewrite.
#[derive(Debug, Clone, Default)]
pub struct CorrectionContext {
    pub agent_name: String,
    pub persona: Option<String>,
    /// Recent conversation, oldest first.
    pub conversation_context: Vec<String>,
    /// Failed similarity check of the message being rewritten.
    pub similarity: Option<SimilarityResult>,
}

/// Result of a rewrite attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectCorrectionResult {
    pub corrected_text: String,
    pub token_usage: TokenUsage,
}

impl DirectCorrectionResult {
    fn unchanged(original: &str) -> Self {
        Self {
            corrected_text: original.to_string(),
            token_usage: TokenUsage::zero(),
        }
    }
}

#[derive(Clone)]
pub struct DirectCorrector {
    judge: Arc<dyn JudgeClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl DirectCorrector {
    pub fn new(judge: Arc<dyn JudgeClient>, config: &JudgeConfig) -> Self {
        Self {
            judge,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_millis(config.direct_correction_timeout_ms),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rewrite `original` to fix the failed dimensions.
    pub async fn correct(
        &self,
        original: &str,
        failed: &[FailedDimension],
        context: &CorrectionContext,
    ) -> DirectCorrectionResult {
        let request = JudgeRequest {
            model: self.model.clone(),
            system_prompt: CORRECTION_SYSTEM_PROMPT.to_string(),
            user_prompt: correction_prompt(original, failed, context),
            output_schema: corrected_text_schema(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let response = match timeout(self.timeout, self.judge.invoke(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Direct correction failed, keeping original text");
                return DirectCorrectionResult::unchanged(original);
            }
            Err(_) => {
                let e = DomainError::JudgeTimeout { timeout_ms };
                warn!(error = %e, "Direct correction timed out, keeping original text");
                return DirectCorrectionResult::unchanged(original);
            }
        };

        let corrected = extract_corrected_text(&response.text);
        if corrected.is_empty() {
            warn!("Direct correction returned an empty payload, keeping original text");
            return DirectCorrectionResult::unchanged(original);
        }

        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Direct correction produced a rewrite"
        );

        DirectCorrectionResult {
            corrected_text: corrected,
            token_usage: response.usage(),
        }
    }
}

fn corrected_text_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "corrected_text": { "type": "string" } },
        "required": ["corrected_text"]
    })
}

/// `corrected_text` from the payload, or the trimmed raw text when it is not JSON.
fn extract_corrected_text(raw: &str) -> String {
    match parse_json_payload(raw) {
        Ok(value) => value
            .get("corrected_text")
            .and_then(Value::as_str)
            .map_or_else(|| raw.trim().to_string(), |s| s.trim().to_string()),
        Err(_) => raw.trim().to_string(),
    }
}

fn correction_prompt(original: &str, failed: &[FailedDimension], context: &CorrectionContext) -> String {
    let mut prompt = format!("Character: {}\n", context.agent_name);

    if let Some(persona) = &context.persona {
        prompt.push_str(&format!("\nPersona:\n{persona}\n"));
    }

    if !context.conversation_context.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for line in &context.conversation_context {
            prompt.push_str(&format!("- {line}\n"));
        }
    }

    prompt.push_str(&format!("\nOriginal message:\n{original}\n\nRules:\n"));
    for (i, dimension) in failed.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} Problem: {}\n",
            i + 1,
            dimension.dimension.correction_rule(),
            if dimension.reasoning.is_empty() {
                dimension.dimension.as_str()
            } else {
                dimension.reasoning.as_str()
            }
        ));
    }
    if let Some(similarity) = &context.similarity {
        prompt.push_str(&format!(
            "{}. Do not repeat recent messages; say something new. Problem: {:.0}% word overlap",
            failed.len() + 1,
            similarity.score * 100.0
        ));
        match &similarity.most_similar_message {
            Some(message) => prompt.push_str(&format!(" with \"{message}\"\n")),
            None => prompt.push_str(" with a recent message\n"),
        }
    }

    prompt.push_str("\nRewrite the original message so it follows every rule.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judges::{MockJudgeClient, MockResponse};
    use crate::domain::models::QualityDimension;

    fn failed() -> Vec<FailedDimension> {
        vec![FailedDimension {
            dimension: QualityDimension::Fluency,
            score: 2,
            threshold: 7,
            reasoning: "repeats itself".to_string(),
            recommendation: String::new(),
        }]
    }

    fn context() -> CorrectionContext {
        CorrectionContext {
            agent_name: "Alice".to_string(),
            persona: Some("A terse sailor.".to_string()),
            conversation_context: vec!["Bob: Where to?".to_string()],
            similarity: None,
        }
    }

    fn corrector(judge: &Arc<MockJudgeClient>) -> DirectCorrector {
        DirectCorrector::new(judge.clone(), &JudgeConfig::default())
    }

    #[tokio::test]
    async fn test_parses_corrected_text() {
        let judge = Arc::new(MockJudgeClient::with_default_response(
            MockResponse::success(r#"{"corrected_text": "North."}"#).with_tokens(30, 4),
        ));
        let result = corrector(&judge)
            .correct("North north north.", &failed(), &context())
            .await;

        assert_eq!(result.corrected_text, "North.");
        assert_eq!(result.token_usage, TokenUsage::new(30, 4));

        let prompt = &judge.requests().await[0].user_prompt;
        assert!(prompt.contains("A terse sailor."));
        assert!(prompt.contains("Bob: Where to?"));
        assert!(prompt.contains("North north north."));
        assert!(prompt.contains(QualityDimension::Fluency.correction_rule()));
    }

    #[tokio::test]
    async fn test_similarity_failure_becomes_a_rule() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::success(
            r#"{"corrected_text": "Storm ahead."}"#,
        )));
        let mut context = context();
        context.similarity = Some(SimilarityResult {
            score: 0.75,
            passed: false,
            threshold: 0.6,
            most_similar_message: Some("Where to, Bob?".to_string()),
        });

        corrector(&judge).correct("Where to?", &[], &context).await;

        let prompt = &judge.requests().await[0].user_prompt;
        assert!(prompt.contains("1. Do not repeat recent messages"));
        assert!(prompt.contains("75% word overlap with \"Where to, Bob?\""));
    }

    #[tokio::test]
    async fn test_non_json_falls_back_to_raw_text() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::success(
            "  Heading north.  ",
        )));
        let result = corrector(&judge).correct("north north", &failed(), &context()).await;
        assert_eq!(result.corrected_text, "Heading north.");
        assert!(!result.token_usage.is_zero());
    }

    #[tokio::test]
    async fn test_judge_error_fails_open() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::failure(
            "rate limited",
        )));
        let result = corrector(&judge).correct("original", &failed(), &context()).await;
        assert_eq!(result.corrected_text, "original");
        assert_eq!(result.token_usage, TokenUsage::zero());
    }

    #[tokio::test]
    async fn test_timeout_fails_open() {
        let judge = Arc::new(
            MockJudgeClient::with_default_response(MockResponse::success(
                r#"{"corrected_text": "too late"}"#,
            ))
            .with_delay(Duration::from_millis(500)),
        );
        let result = corrector(&judge)
            .with_timeout(Duration::from_millis(20))
            .correct("original", &failed(), &context())
            .await;
        assert_eq!(result.corrected_text, "original");
        assert!(result.token_usage.is_zero());
    }

    #[tokio::test]
    async fn test_empty_payload_fails_open() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::success(
            r#"{"corrected_text": "   "}"#,
        )));
        let result = corrector(&judge).correct("original", &failed(), &context()).await;
        assert_eq!(result.corrected_text, "original");
        assert!(result.token_usage.is_zero());
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        let config = JudgeConfig::default();
        assert_eq!(
            Duration::from_millis(config.direct_correction_timeout_ms),
            DEFAULT_CORRECTION_TIMEOUT
        );
    }
}
