//! Aggregate scoring of experiment conditions.
//!
//! Scores each conversation of a condition against a proposition set,
//! persists the run lifecycle, and compares conditions with the
//! significance engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    EvaluationRun, Proposition, ScoreResult, ScoringContext, SignificanceReport, TokenUsage,
};
use crate::domain::ports::EvaluationRunRepository;
use crate::services::proposition_scorer::PropositionScorer;
use crate::services::statistics::significance_report;

/// What to score for one condition.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Condition label, e.g. "treatment" or "control".
    pub condition: String,
    pub propositions: Vec<Proposition>,
    /// One context per conversation.
    pub contexts: Vec<ScoringContext>,
}

/// Per-conversation aggregate scores of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunScores {
    pub run_id: Uuid,
    pub condition: String,
    pub scores: Vec<f64>,
    pub token_usage: TokenUsage,
}

pub struct ExperimentEvaluator {
    scorer: PropositionScorer,
    runs: Arc<dyn EvaluationRunRepository>,
}

impl ExperimentEvaluator {
    pub fn new(scorer: PropositionScorer, runs: Arc<dyn EvaluationRunRepository>) -> Self {
        Self { scorer, runs }
    }

    /// Score every context of a condition.
    ///
    /// On a scoring failure the run is marked failed before the error is returned.
    #[instrument(skip(self, spec), fields(condition = %spec.condition))]
    pub async fn evaluate_run(&self, spec: &RunSpec) -> DomainResult<RunScores> {
        let run = EvaluationRun::start(spec.condition.clone());
        self.runs.create(&run).await?;

        match self.score_contexts(spec).await {
            Ok((scores, token_usage)) => {
                self.runs.mark_completed(run.id).await?;
                info!(
                    run_id = %run.id,
                    conversations = scores.len(),
                    tokens = token_usage.total(),
                    "Evaluation run completed"
                );
                Ok(RunScores {
                    run_id: run.id,
                    condition: spec.condition.clone(),
                    scores,
                    token_usage,
                })
            }
            Err(e) => {
                error!(run_id = %run.id, error = %e, "Evaluation run failed");
                if let Err(mark_err) = self.runs.mark_failed(run.id, &e.to_string()).await {
                    warn!(run_id = %run.id, error = %mark_err, "Failed to mark evaluation run as failed");
                }
                Err(e)
            }
        }
    }

    async fn score_contexts(&self, spec: &RunSpec) -> DomainResult<(Vec<f64>, TokenUsage)> {
        let mut scores = Vec::with_capacity(spec.contexts.len());
        let mut token_usage = TokenUsage::zero();

        for context in &spec.contexts {
            let batch = self.scorer.score_batch(&spec.propositions, context).await?;
            token_usage += batch.token_usage;
            scores.push(weighted_mean(&spec.propositions, &batch.results));
        }

        Ok((scores, token_usage))
    }

    /// Welch's t-test and Cohen's d of treatment against control.
    pub fn compare(treatment: &RunScores, control: &RunScores) -> SignificanceReport {
        significance_report(&treatment.scores, &control.scores)
    }
}

/// Weighted mean of effective scores; a plain mean when weights sum to 0.
pub fn weighted_mean(propositions: &[Proposition], results: &[ScoreResult]) -> f64 {
    if propositions.is_empty() {
        return 0.0;
    }

    let effective: Vec<(f64, f64)> = propositions
        .iter()
        .zip(results)
        .map(|(p, r)| (p.weight, f64::from(p.effective_score(r.score))))
        .collect();

    let total_weight: f64 = effective.iter().map(|(w, _)| w).sum();
    if total_weight == 0.0 {
        return effective.iter().map(|(_, s)| s).sum::<f64>() / effective.len() as f64;
    }
    effective.iter().map(|(w, s)| w * s).sum::<f64>() / total_weight
}
