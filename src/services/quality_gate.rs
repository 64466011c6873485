//! Multi-dimension quality gate.
//!
//! Scores a proposed message on each enabled behavioral dimension
//! concurrently, runs the similarity check, and reduces everything to one
//! pass/fail verdict.

use futures::future::join_all;
use tracing::{debug, info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    DimensionResult, GateConfig, GateOptions, GateResult, Proposition, QualityDimension,
    ScoringContext, TokenUsage, TrajectoryEntry,
};
use crate::services::action_similarity::check_action_similarity;
use crate::services::proposition_scorer::{PropositionScorer, ScoreOptions};

/// Speaker name used for prior conversation snippets.
pub const OTHER_SPEAKER: &str = "Other";

/// Name used for the acting agent when the caller supplies none.
pub const DEFAULT_AGENT_NAME: &str = "Agent";

/// Quality gate over a proposition scorer.
#[derive(Clone)]
pub struct QualityGate {
    scorer: PropositionScorer,
}

impl QualityGate {
    pub fn new(scorer: PropositionScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &PropositionScorer {
        &self.scorer
    }

    /// Evaluate a proposed message.
    ///
    /// Every dimension call is issued before any is awaited. A failing
    /// dimension does not cancel its siblings; the first error is returned
    /// once all have finished.
    #[instrument(skip(self, config, proposed, prior_messages, options), fields(agent_id = %agent_id))]
    pub async fn evaluate(
        &self,
        config: &GateConfig,
        agent_id: &str,
        proposed: &str,
        prior_messages: &[String],
        options: &GateOptions,
    ) -> DomainResult<GateResult> {
        if config.is_noop() {
            debug!("All gate checks disabled");
            return Ok(GateResult::trivial_pass());
        }

        let agent_name = options.agent_name.as_deref().unwrap_or(DEFAULT_AGENT_NAME);
        let context = build_context(agent_name, proposed, prior_messages, options.persona.clone());
        let without_persona = context.without_persona();

        let dimensions = config.enabled_dimensions();
        let scoring = dimensions.iter().map(|&(dimension, threshold)| {
            let ctx = if dimension.uses_persona() {
                &context
            } else {
                &without_persona
            };
            self.score_dimension(dimension, threshold, agent_name, ctx)
        });
        let scored = join_all(scoring).await;

        let mut dimension_results = Vec::with_capacity(scored.len());
        let mut token_usage = TokenUsage::zero();
        for outcome in scored {
            let (result, usage) = outcome?;
            token_usage += usage;
            dimension_results.push(result);
        }

        let similarity_result = config.similarity.enabled.then(|| {
            check_action_similarity(
                proposed,
                &options.recent_messages,
                config.similarity.threshold,
            )
        });

        let passed = dimension_results.iter().all(|d| d.passed)
            && similarity_result.as_ref().is_none_or(|s| s.passed);
        let total_score = dimension_results.iter().map(|d| u32::from(d.score)).sum();

        info!(
            passed,
            total_score,
            dimensions = dimension_results.len(),
            similarity = similarity_result.as_ref().map(|s| s.score),
            "Quality gate evaluated"
        );

        Ok(GateResult {
            passed,
            dimension_results,
            similarity_result,
            total_score,
            token_usage,
        })
    }

    async fn score_dimension(
        &self,
        dimension: QualityDimension,
        threshold: u8,
        agent_name: &str,
        context: &ScoringContext,
    ) -> DomainResult<(DimensionResult, TokenUsage)> {
        let proposition = Proposition::new(dimension.as_str(), dimension.claim(agent_name));
        let scored = self
            .scorer
            .score(&proposition, context, ScoreOptions::default())
            .await?;
        let score = proposition.effective_score(scored.score);

        Ok((
            DimensionResult {
                dimension,
                score,
                reasoning: scored.reasoning,
                passed: score >= threshold,
                threshold,
            },
            scored.token_usage,
        ))
    }
}

/// Prior snippets become stimuli, the proposed text the final action.
pub fn build_context(
    agent_name: &str,
    proposed: &str,
    prior_messages: &[String],
    persona: Option<String>,
) -> ScoringContext {
    let mut trajectory: Vec<TrajectoryEntry> = prior_messages
        .iter()
        .map(|snippet| TrajectoryEntry::stimulus(OTHER_SPEAKER, snippet.clone()))
        .collect();
    trajectory.push(TrajectoryEntry::action(agent_name, proposed));

    ScoringContext {
        trajectory,
        persona,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judges::{MockJudgeClient, MockResponse};
    use crate::domain::errors::DomainError;
    use crate::domain::models::{DimensionConfig, SimilarityConfig};
    use crate::services::proposition_scorer::ScorerConfig;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn gate(judge: &Arc<MockJudgeClient>) -> QualityGate {
        QualityGate::new(PropositionScorer::new(judge.clone(), ScorerConfig::default()))
    }

    fn options() -> GateOptions {
        GateOptions::default()
            .with_agent_name("Alice")
            .with_persona("A cautious botanist.")
    }

    /// Answers by dimension so results are independent of call order.
    fn by_dimension(req: &crate::domain::ports::JudgeRequest) -> MockResponse {
        let score = if req.user_prompt.contains("is fluent") {
            3
        } else if req.user_prompt.contains("persona description") {
            8
        } else {
            7
        };
        MockResponse::score(score, "judged").with_tokens(10, 2)
    }

    #[tokio::test]
    async fn test_noop_config_makes_no_calls() {
        let judge = Arc::new(MockJudgeClient::new());
        let result = gate(&judge)
            .evaluate(&GateConfig::disabled(), "a1", "hello", &[], &options())
            .await
            .unwrap();

        assert!(result.passed);
        assert!(result.dimension_results.is_empty());
        assert!(result.similarity_result.is_none());
        assert_eq!(result.total_score, 0);
        assert_eq!(judge.call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_dimensions_scored_and_summed() {
        let judge = Arc::new(MockJudgeClient::new().with_responder(by_dimension));
        let config = GateConfig::default().with_similarity(SimilarityConfig::disabled());

        let result = gate(&judge)
            .evaluate(&config, "a1", "I'll water the ferns.", &[], &options())
            .await
            .unwrap();

        assert_eq!(judge.call_count(), 4);
        assert_eq!(result.dimension_results.len(), 4);
        assert_eq!(result.total_score, 8 + 7 + 3 + 7);
        assert!(!result.passed);
        assert_eq!(result.token_usage, TokenUsage::new(40, 8));

        let failed: Vec<_> = result.failed_dimensions().map(|d| d.dimension).collect();
        assert_eq!(failed, vec![QualityDimension::Fluency]);
    }

    #[tokio::test]
    async fn test_persona_only_for_persona_dimensions() {
        let judge = Arc::new(MockJudgeClient::new());
        let config = GateConfig::default().with_similarity(SimilarityConfig::disabled());
        gate(&judge)
            .evaluate(&config, "a1", "text", &["earlier".to_string()], &options())
            .await
            .unwrap();

        for request in judge.requests().await {
            let with_persona = request.system_prompt.contains("A cautious botanist.");
            let persona_dimension = request.user_prompt.contains("persona description")
                || request.user_prompt.contains("is suitable");
            assert_eq!(with_persona, persona_dimension);
            assert!(request
                .user_prompt
                .contains("--> Other: earlier\nAlice acts: text"));
        }
    }

    #[tokio::test]
    async fn test_dimension_calls_run_concurrently() {
        let judge = Arc::new(MockJudgeClient::new().with_delay(Duration::from_millis(200)));
        let config = GateConfig::default().with_similarity(SimilarityConfig::disabled());

        let started = Instant::now();
        gate(&judge)
            .evaluate(&config, "a1", "text", &[], &options())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_similarity_only_gate() {
        let judge = Arc::new(MockJudgeClient::new());
        let config = GateConfig::disabled().with_similarity(SimilarityConfig::default());
        let opts = options().with_recent_messages(vec!["Let us go now".to_string()]);

        let result = gate(&judge)
            .evaluate(&config, "a1", "let us go now!", &[], &opts)
            .await
            .unwrap();

        assert_eq!(judge.call_count(), 0);
        assert!(!result.passed);
        assert_eq!(result.similarity_score(), Some(1.0));
        assert_eq!(result.total_score, 0);
    }

    #[tokio::test]
    async fn test_threshold_boundary_passes() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::score(
            5, "borderline",
        )));
        let config = GateConfig::disabled()
            .with_dimension(QualityDimension::Fluency, DimensionConfig::enabled_with(5));

        let result = gate(&judge)
            .evaluate(&config, "a1", "text", &[], &options())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.dimension_results[0].threshold, 5);
    }

    #[tokio::test]
    async fn test_dimension_error_propagates() {
        let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::failure(
            "provider down",
        )));
        let config = GateConfig::default();

        let err = gate(&judge)
            .evaluate(&config, "a1", "text", &[], &options())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::JudgeFailed(_)));
        assert_eq!(judge.call_count(), 4);
    }
}
