//! Correction pipeline.
//!
//! A per-(run, agent) retry state machine, re-entered once per candidate
//! message:
//!
//! 1. Skip evaluation until the agent has taken enough actions.
//! 2. Run the quality gate and record the attempt.
//! 3. On pass, finish with `passed` or `regeneration_success`.
//! 4. Otherwise ask the caller to regenerate while that budget lasts.
//! 5. Then try direct rewrites while that budget lasts.
//! 6. Then force the best attempt through.
//!
//! State survives only across `regeneration_requested` returns and is
//! cleared on every terminal outcome.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Config, CorrectionAttempt, CorrectionConfig, CorrectionKey, CorrectionLogRecord,
    CorrectionOutcome, CorrectionRequest, CorrectionResult, CorrectionStage, CorrectionState,
    DimensionScore, FailedDimension, GateConfig, GateResult, RegenerationFeedback, TokenUsage,
};
use crate::domain::ports::{CorrectionLogStore, CorrectionStateStore, JudgeClient};
use crate::services::direct_correction::{CorrectionContext, DirectCorrector};
use crate::services::proposition_scorer::{PropositionScorer, ScorerConfig};
use crate::services::quality_gate::QualityGate;

pub struct CorrectionPipeline {
    gate: QualityGate,
    corrector: DirectCorrector,
    state: Arc<dyn CorrectionStateStore>,
    audit: Arc<dyn CorrectionLogStore>,
    gate_config: GateConfig,
    config: CorrectionConfig,
}

/// Per-invocation bookkeeping.
struct Invocation<'a> {
    request: &'a CorrectionRequest,
    key: CorrectionKey,
    state: CorrectionState,
    token_usage: TokenUsage,
    started: Instant,
}

impl CorrectionPipeline {
    pub fn new(
        gate: QualityGate,
        corrector: DirectCorrector,
        state: Arc<dyn CorrectionStateStore>,
        audit: Arc<dyn CorrectionLogStore>,
    ) -> Self {
        Self {
            gate,
            corrector,
            state,
            audit,
            gate_config: GateConfig::default(),
            config: CorrectionConfig::default(),
        }
    }

    /// Wire a pipeline from application config.
    pub fn from_config(
        judge: Arc<dyn JudgeClient>,
        config: &Config,
        state: Arc<dyn CorrectionStateStore>,
        audit: Arc<dyn CorrectionLogStore>,
    ) -> Self {
        let scorer = PropositionScorer::new(judge.clone(), ScorerConfig::from(&config.judge));
        Self::new(
            QualityGate::new(scorer),
            DirectCorrector::new(judge, &config.judge),
            state,
            audit,
        )
        .with_gate_config(config.gate)
        .with_correction_config(config.correction)
    }

    pub fn with_gate_config(mut self, gate_config: GateConfig) -> Self {
        self.gate_config = gate_config;
        self
    }

    pub fn with_correction_config(mut self, config: CorrectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn correction_config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Drop the retry state for one agent.
    pub async fn clear(&self, key: &CorrectionKey) {
        self.state.clear(key).await;
    }

    /// Drop all retry state.
    pub async fn clear_all(&self) {
        self.state.clear_all().await;
    }

    /// Evaluate one candidate message.
    #[instrument(skip(self, request), fields(run_id = %request.run_id, agent_id = %request.agent_id))]
    pub async fn process(&self, request: &CorrectionRequest) -> DomainResult<CorrectionResult> {
        if request.prior_action_count < self.config.min_actions_before_evaluation {
            debug!(
                prior_actions = request.prior_action_count,
                required = self.config.min_actions_before_evaluation,
                "Below minimum action count, skipping evaluation"
            );
            let run = Invocation {
                request,
                key: request.state_key(),
                state: CorrectionState::default(),
                token_usage: TokenUsage::zero(),
                started: Instant::now(),
            };
            let result = CorrectionResult {
                outcome: CorrectionOutcome::Passed,
                final_text: request.text.clone(),
                gate_result: GateResult::trivial_pass(),
                feedback: None,
                best_attempt: None,
                attempts: Vec::new(),
                token_usage: TokenUsage::zero(),
            };
            self.log(&run, &result).await;
            return Ok(result);
        }

        let key = request.state_key();
        let mut state = self.state.load(&key).await.unwrap_or_default();
        if state.original_text.is_none() {
            state.original_text = Some(request.text.clone());
        }

        let mut run = Invocation {
            request,
            key,
            state,
            token_usage: TokenUsage::zero(),
            started: Instant::now(),
        };

        let stage = if run.state.regeneration_count > 0 {
            CorrectionStage::Regeneration
        } else {
            CorrectionStage::Original
        };

        let gate_result = self.evaluate(&run, &request.text).await?;
        run.token_usage += gate_result.token_usage;
        record_attempt(&mut run.state, stage, &request.text, &gate_result);

        if gate_result.passed {
            let outcome = if stage == CorrectionStage::Regeneration {
                CorrectionOutcome::RegenerationSuccess
            } else {
                CorrectionOutcome::Passed
            };
            return Ok(self
                .finish(run, outcome, request.text.clone(), gate_result, None, None)
                .await);
        }

        let max = self.config.max_correction_attempts;

        if self.config.regeneration_enabled && run.state.regeneration_count < max {
            run.state.regeneration_count += 1;
            let feedback = RegenerationFeedback::from_gate(
                &request.text,
                &gate_result,
                run.state.regeneration_count,
                max,
            );

            info!(
                attempt = feedback.attempt_number,
                failed = feedback.failed_dimensions.len(),
                too_similar = feedback.similarity.is_some(),
                "Requesting regeneration"
            );

            return Ok(self
                .finish(
                    run,
                    CorrectionOutcome::RegenerationRequested,
                    request.text.clone(),
                    gate_result,
                    Some(feedback),
                    None,
                )
                .await);
        }

        if self.config.direct_correction_enabled && run.state.direct_correction_count < max {
            let mut context = CorrectionContext {
                agent_name: request
                    .options
                    .agent_name
                    .clone()
                    .unwrap_or_else(|| request.agent_id.clone()),
                persona: request.options.persona.clone(),
                conversation_context: request.prior_messages.clone(),
                similarity: None,
            };

            let mut current_text = request.text.clone();
            let mut current_gate = gate_result;

            while run.state.direct_correction_count < max {
                run.state.direct_correction_count += 1;
                let failed = FailedDimension::collect(&current_gate);
                context.similarity = current_gate.failed_similarity().cloned();

                let corrected = self
                    .corrector
                    .correct(&current_text, &failed, &context)
                    .await;
                run.token_usage += corrected.token_usage;

                let gate = self.evaluate(&run, &corrected.corrected_text).await?;
                run.token_usage += gate.token_usage;
                record_attempt(
                    &mut run.state,
                    CorrectionStage::DirectCorrection,
                    &corrected.corrected_text,
                    &gate,
                );

                if gate.passed {
                    return Ok(self
                        .finish(
                            run,
                            CorrectionOutcome::DirectCorrectionSuccess,
                            corrected.corrected_text,
                            gate,
                            None,
                            None,
                        )
                        .await);
                }

                debug!(
                    attempt = run.state.direct_correction_count,
                    total_score = gate.total_score,
                    "Direct correction did not pass the gate"
                );
                current_text = corrected.corrected_text;
                current_gate = gate;
            }

            return Ok(self.force_through(run, current_gate).await);
        }

        Ok(self.force_through(run, gate_result).await)
    }

    async fn evaluate(&self, run: &Invocation<'_>, text: &str) -> DomainResult<GateResult> {
        self.gate
            .evaluate(
                &self.gate_config,
                &run.request.agent_id,
                text,
                &run.request.prior_messages,
                &run.request.options,
            )
            .await
    }

    async fn force_through(&self, run: Invocation<'_>, last_gate: GateResult) -> CorrectionResult {
        let best = run.state.best_attempt().cloned();
        let final_text = if self.config.continue_on_failure {
            best.as_ref()
                .map_or_else(|| run.request.text.clone(), |b| b.text.clone())
        } else {
            run.state
                .original_text
                .clone()
                .unwrap_or_else(|| run.request.text.clone())
        };

        warn!(
            best_total = best.as_ref().map(|b| b.gate_result.total_score),
            continue_on_failure = self.config.continue_on_failure,
            "Correction budgets exhausted, forcing message through"
        );

        self.finish(run, CorrectionOutcome::ForcedThrough, final_text, last_gate, None, best)
            .await
    }

    /// Persist or clear state, log, build the result.
    async fn finish(
        &self,
        run: Invocation<'_>,
        outcome: CorrectionOutcome,
        final_text: String,
        gate_result: GateResult,
        feedback: Option<RegenerationFeedback>,
        best_attempt: Option<CorrectionAttempt>,
    ) -> CorrectionResult {
        if outcome.is_terminal() {
            self.state.clear(&run.key).await;
            info!(
                outcome = outcome.as_str(),
                attempts = run.state.attempts.len(),
                total_score = gate_result.total_score,
                "Correction pipeline finished"
            );
        } else {
            self.state.save(&run.key, run.state.clone()).await;
        }

        let result = CorrectionResult {
            outcome,
            final_text,
            gate_result,
            feedback,
            best_attempt,
            attempts: run.state.attempts.clone(),
            token_usage: run.token_usage,
        };
        self.log(&run, &result).await;
        result
    }

    /// Best-effort audit write.
    async fn log(&self, run: &Invocation<'_>, result: &CorrectionResult) {
        let last = run.state.attempts.last();
        let record = CorrectionLogRecord {
            id: Uuid::new_v4(),
            agent_id: run.request.agent_id.clone(),
            run_id: Some(run.request.run_id),
            channel_id: run.request.channel_id.clone(),
            original_text: run
                .state
                .original_text
                .clone()
                .unwrap_or_else(|| run.request.text.clone()),
            final_text: result.final_text.clone(),
            stage: last.map_or(CorrectionStage::Original, |a| a.stage),
            attempt_number: last.map_or(1, |a| a.attempt_number),
            outcome: result.outcome,
            dimension_scores: DimensionScore::from_gate(&result.gate_result),
            similarity_score: result.gate_result.similarity_score(),
            total_score: result.gate_result.total_score,
            token_usage: result.token_usage,
            duration_ms: Some(u64::try_from(run.started.elapsed().as_millis()).unwrap_or(u64::MAX)),
            created_at: Utc::now(),
        };

        if let Err(e) = self.audit.record_correction(&record).await {
            warn!(error = %e, "Failed to write correction audit log");
        }
    }
}

fn record_attempt(
    state: &mut CorrectionState,
    stage: CorrectionStage,
    text: &str,
    gate_result: &GateResult,
) {
    let attempt_number = state.next_attempt_number();
    state.attempts.push(CorrectionAttempt {
        stage,
        attempt_number,
        text: text.to_string(),
        gate_result: gate_result.clone(),
    });
}
