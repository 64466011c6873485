//! Proposition scoring engine.
//!
//! Turns a natural-language claim plus a trajectory into a 0-9 score or a
//! boolean verdict through the judge model. Handles precondition gating,
//! batching in fixed-size chunks and the optional double-check pass.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    BatchScoreResult, CheckResult, JudgeConfig, Proposition, ScoreResult, ScoringContext,
    TokenUsage,
};
use crate::domain::ports::{JudgeClient, JudgeRequest};
use crate::services::response_parser::{
    parse_batch_response, parse_check_response, parse_score_response,
};

/// Propositions per batched judge call.
pub const BATCH_CHUNK_SIZE: usize = 10;

pub const SCORING_RUBRIC: &str = "\
You are an impartial judge evaluating claims about the behavior of an agent in a conversation.
You will be shown a trajectory of what happened and a claim about it.

Score the claim on a scale from 0 to 9:
- 0 means the claim is definitively false.
- 9 means the claim is definitively true.
- 4 or 5 means the evidence is mixed.

Rules:
- If the trajectory contains no evidence about the claim, assume it is true and score 9.
- Any evidence that contradicts the claim overrides positive evidence.
- When the claim covers several elements, judge each element and average the evidence.
- When uncertain between two scores, choose the lower one.

Always respond with JSON only.";

const DOUBLE_CHECK_PROMPT: &str =
    "Are you sure? Re-read the trajectory and the claim, and revise your score if needed. \
Respond with the same JSON structure.";

/// Judge call parameters shared by every scoring request.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self::from(&JudgeConfig::default())
    }
}

impl From<&JudgeConfig> for ScorerConfig {
    fn from(config: &JudgeConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreOptions {
    /// Ask the judge to confirm or revise its first answer.
    pub double_check: bool,
}

impl ScoreOptions {
    pub fn double_checked() -> Self {
        Self { double_check: true }
    }
}

pub fn score_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": { "type": "integer", "minimum": 0, "maximum": 9 },
            "reasoning": { "type": "string" },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
        },
        "required": ["score", "reasoning", "confidence"]
    })
}

pub fn check_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "result": { "type": "boolean" },
            "reasoning": { "type": "string" },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
        },
        "required": ["result", "reasoning", "confidence"]
    })
}

pub fn batch_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "results": { "type": "array", "items": score_schema() }
        },
        "required": ["results"]
    })
}

/// Scores propositions against trajectories through a judge client.
#[derive(Clone)]
pub struct PropositionScorer {
    judge: Arc<dyn JudgeClient>,
    config: ScorerConfig,
}

impl PropositionScorer {
    pub fn new(judge: Arc<dyn JudgeClient>, config: ScorerConfig) -> Self {
        Self { judge, config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score a proposition from 0 (false) to 9 (true).
    ///
    /// The returned score is the raw judge score. Consumers apply inversion
    /// through [`Proposition::effective_score`].
    #[instrument(skip(self, proposition, context), fields(proposition = %proposition.id))]
    pub async fn score(
        &self,
        proposition: &Proposition,
        context: &ScoringContext,
        options: ScoreOptions,
    ) -> DomainResult<ScoreResult> {
        if !proposition.precondition_holds(context) {
            debug!("Precondition not met, skipping judge call");
            return Ok(ScoreResult::trivially_true());
        }

        let system_prompt = system_prompt(context);
        let user_prompt = score_prompt(&proposition.claim, context);

        let response = self
            .judge
            .invoke(self.request(&system_prompt, &user_prompt, score_schema()))
            .await?;
        let mut result = parse_score_response(&response.text)?;
        result.token_usage = response.usage();

        debug!(
            judge = self.judge.name(),
            score = result.score,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Scored proposition"
        );

        if !options.double_check {
            return Ok(result);
        }

        let follow_up = format!(
            "{user_prompt}\n\nYour previous answer:\n{}\n\n{DOUBLE_CHECK_PROMPT}",
            response.text.trim()
        );
        let revision = self
            .judge
            .invoke(self.request(&system_prompt, &follow_up, score_schema()))
            .await?;
        let mut revised = parse_score_response(&revision.text)?;
        revised.token_usage = result.token_usage + revision.usage();

        debug!(
            first = result.score,
            revised = revised.score,
            "Double-checked proposition"
        );

        Ok(revised)
    }

    /// Judge a proposition as true or false.
    #[instrument(skip(self, proposition, context), fields(proposition = %proposition.id))]
    pub async fn check(
        &self,
        proposition: &Proposition,
        context: &ScoringContext,
    ) -> DomainResult<CheckResult> {
        if !proposition.precondition_holds(context) {
            debug!("Precondition not met, skipping judge call");
            return Ok(CheckResult::trivially_true());
        }

        let response = self
            .judge
            .invoke(self.request(
                &system_prompt(context),
                &check_prompt(&proposition.claim, context),
                check_schema(),
            ))
            .await?;
        let mut result = parse_check_response(&response.text)?;
        result.token_usage = response.usage();

        debug!(
            judge = self.judge.name(),
            result = result.result,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Checked proposition"
        );

        Ok(result)
    }

    /// Score many propositions against one context, ten per judge call.
    ///
    /// Propositions whose precondition fails are never sent to the judge and
    /// keep their position with a trivially-true result.
    pub async fn score_batch(
        &self,
        propositions: &[Proposition],
        context: &ScoringContext,
    ) -> DomainResult<BatchScoreResult> {
        let mut results: Vec<ScoreResult> = Vec::with_capacity(propositions.len());
        let mut pending: Vec<usize> = Vec::new();

        for (index, proposition) in propositions.iter().enumerate() {
            results.push(ScoreResult::trivially_true());
            if proposition.precondition_holds(context) {
                pending.push(index);
            }
        }

        let system_prompt = system_prompt(context);
        let mut token_usage = TokenUsage::zero();

        for chunk in pending.chunks(BATCH_CHUNK_SIZE) {
            let claims: Vec<&str> = chunk
                .iter()
                .map(|&i| propositions[i].claim.as_str())
                .collect();

            let response = self
                .judge
                .invoke(self.request(
                    &system_prompt,
                    &batch_prompt(&claims, context),
                    batch_schema(),
                ))
                .await?;
            let scored = parse_batch_response(&response.text, chunk.len())?;
            token_usage += response.usage();

            debug!(
                judge = self.judge.name(),
                chunk_size = chunk.len(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "Scored proposition batch"
            );

            for (&index, result) in chunk.iter().zip(scored) {
                results[index] = result;
            }
        }

        Ok(BatchScoreResult {
            results,
            token_usage,
        })
    }

    fn request(&self, system_prompt: &str, user_prompt: &str, schema: Value) -> JudgeRequest {
        JudgeRequest {
            model: self.config.model.clone(),
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            output_schema: schema,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

fn system_prompt(context: &ScoringContext) -> String {
    match &context.persona {
        Some(persona) => format!(
            "{SCORING_RUBRIC}\n\nThe agent being judged has this persona:\n{persona}"
        ),
        None => SCORING_RUBRIC.to_string(),
    }
}

fn score_prompt(claim: &str, context: &ScoringContext) -> String {
    format!(
        "Trajectory:\n{}\n\nClaim: {claim}\n\n\
Score the claim from 0 to 9 and respond as {{\"score\": <int>, \"reasoning\": <string>, \"confidence\": <0-1>}}.",
        context.formatted_trajectory()
    )
}

fn check_prompt(claim: &str, context: &ScoringContext) -> String {
    format!(
        "Trajectory:\n{}\n\nClaim: {claim}\n\n\
Decide whether the claim is true and respond as {{\"result\": <bool>, \"reasoning\": <string>, \"confidence\": <0-1>}}.",
        context.formatted_trajectory()
    )
}

fn batch_prompt(claims: &[&str], context: &ScoringContext) -> String {
    let numbered = claims
        .iter()
        .enumerate()
        .map(|(i, claim)| format!("{}. {claim}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Trajectory:\n{}\n\nClaims:\n{numbered}\n\n\
Score each claim independently from 0 to 9. Respond with {{\"results\": [...]}} containing exactly {} entries \
in claim order, each {{\"score\": <int>, \"reasoning\": <string>, \"confidence\": <0-1>}}.",
        context.formatted_trajectory(),
        claims.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judges::{MockJudgeClient, MockResponse};
    use crate::domain::errors::DomainError;
    use crate::domain::models::TrajectoryEntry;

    fn context() -> ScoringContext {
        ScoringContext::new(vec![
            TrajectoryEntry::stimulus("Bob", "Should we leave?"),
            TrajectoryEntry::action("Alice", "Yes, right now."),
        ])
    }

    fn scorer(judge: &Arc<MockJudgeClient>) -> PropositionScorer {
        PropositionScorer::new(judge.clone(), ScorerConfig::default())
    }

    fn batch_payload(n: usize, score: u8) -> MockResponse {
        let entries: Vec<Value> = (0..n)
            .map(|_| json!({ "score": score, "reasoning": "r", "confidence": 0.7 }))
            .collect();
        MockResponse::success(json!({ "results": entries }).to_string()).with_tokens(10, 5)
    }

    #[tokio::test]
    async fn test_false_precondition_skips_judge() {
        let judge = Arc::new(MockJudgeClient::new());
        let prop = Proposition::new("p", "Alice is calm").with_precondition(|_| false);

        let score = scorer(&judge)
            .score(&prop, &context(), ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(score.score, 9);
        assert_eq!(score.confidence, 1.0);
        assert!(score.token_usage.is_zero());

        let check = scorer(&judge).check(&prop, &context()).await.unwrap();
        assert!(check.result);
        assert_eq!(check.confidence, 1.0);

        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_score_builds_prompts() {
        let judge = Arc::new(MockJudgeClient::with_default_response(
            MockResponse::score(6, "mostly").with_tokens(40, 8),
        ));
        let prop = Proposition::new("p", "Alice is decisive");
        let ctx = context().with_persona("A bold explorer.");

        let result = scorer(&judge)
            .score(&prop, &ctx, ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(result.score, 6);
        assert_eq!(result.token_usage, TokenUsage::new(40, 8));

        let requests = judge.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system_prompt.contains("A bold explorer."));
        assert!(requests[0]
            .user_prompt
            .contains("--> Bob: Should we leave?\nAlice acts: Yes, right now."));
        assert!(requests[0].user_prompt.contains("Claim: Alice is decisive"));
    }

    #[tokio::test]
    async fn test_persona_absent_from_system_prompt_when_not_supplied() {
        let judge = Arc::new(MockJudgeClient::new());
        scorer(&judge)
            .score(&Proposition::new("p", "c"), &context(), ScoreOptions::default())
            .await
            .unwrap();
        assert_eq!(judge.requests().await[0].system_prompt, SCORING_RUBRIC);
    }

    #[tokio::test]
    async fn test_double_check_replaces_score_and_sums_tokens() {
        let judge = Arc::new(MockJudgeClient::new());
        judge
            .push_responses([
                MockResponse::score(8, "first").with_tokens(100, 10),
                MockResponse::score(3, "revised").with_tokens(150, 12),
            ])
            .await;

        let result = scorer(&judge)
            .score(
                &Proposition::new("p", "claim"),
                &context(),
                ScoreOptions::double_checked(),
            )
            .await
            .unwrap();

        assert_eq!(result.score, 3);
        assert_eq!(result.reasoning, "revised");
        assert_eq!(result.token_usage, TokenUsage::new(250, 22));

        let requests = judge.requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[1].user_prompt.contains("Are you sure?"));
        assert!(requests[1].user_prompt.contains("\"first\""));
    }

    #[tokio::test]
    async fn test_check_propagates_protocol_errors() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::success(
            r#"{"result": "maybe"}"#,
        )));
        let err = scorer(&judge)
            .check(&Proposition::new("p", "claim"), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCheckResult { .. }));
    }

    #[tokio::test]
    async fn test_batch_of_twelve_uses_two_calls() {
        let judge = Arc::new(MockJudgeClient::new());
        judge
            .push_responses([batch_payload(10, 7), batch_payload(2, 2)])
            .await;

        let props: Vec<Proposition> = (0..12)
            .map(|i| Proposition::new(format!("p{i}"), format!("claim {i}")))
            .collect();
        let batch = scorer(&judge).score_batch(&props, &context()).await.unwrap();

        assert_eq!(judge.call_count(), 2);
        assert_eq!(batch.results.len(), 12);
        assert!(batch.results[..10].iter().all(|r| r.score == 7));
        assert!(batch.results[10..].iter().all(|r| r.score == 2));
        assert_eq!(batch.token_usage, TokenUsage::new(20, 10));

        let requests = judge.requests().await;
        assert!(requests[0].user_prompt.contains("10. claim 9"));
        assert!(requests[1].user_prompt.contains("1. claim 10\n2. claim 11"));
    }

    #[tokio::test]
    async fn test_batch_keeps_gated_propositions_in_place() {
        let judge = Arc::new(MockJudgeClient::with_default_response(batch_payload(2, 1)));
        let props = vec![
            Proposition::new("a", "first"),
            Proposition::new("b", "gated").with_precondition(|_| false),
            Proposition::new("c", "third"),
        ];

        let batch = scorer(&judge).score_batch(&props, &context()).await.unwrap();
        let scores: Vec<u8> = batch.results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![1, 9, 1]);
        assert!(!judge.requests().await[0].user_prompt.contains("gated"));
    }

    #[tokio::test]
    async fn test_batch_length_mismatch_propagates() {
        let judge = Arc::new(MockJudgeClient::with_default_response(batch_payload(1, 5)));
        let props = vec![Proposition::new("a", "x"), Proposition::new("b", "y")];

        let err = scorer(&judge)
            .score_batch(&props, &context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::BatchLengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let judge = Arc::new(MockJudgeClient::new());
        let batch = scorer(&judge).score_batch(&[], &context()).await.unwrap();
        assert!(batch.results.is_empty());
        assert_eq!(judge.call_count(), 0);
    }
}
