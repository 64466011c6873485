//! Intervention framework.
//!
//! An intervention fires a nudge when all of its configured preconditions
//! hold. Preconditions are evaluated in a fixed order, cheapest first, and
//! the chain stops at the first failure:
//!
//! 1. functional: a pure predicate over the targets and full context
//! 2. textual: a proposition `check` against the windowed context
//! 3. propositional: a proposition `score` below a threshold

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    first_target_of, InterventionLogRecord, InterventionResult, InterventionTarget,
    PreconditionKind, PreconditionResult, Proposition, ScoringContext, TargetKind, TokenUsage,
    TrajectoryWindow,
};
use crate::domain::ports::InterventionLogStore;
use crate::services::proposition_scorer::{PropositionScorer, ScoreOptions};

/// Rubric midpoint; a propositional precondition passes below it.
pub const DEFAULT_PROPOSITIONAL_THRESHOLD: u8 = 5;

pub type FunctionalPrecondition =
    Arc<dyn Fn(&[InterventionTarget], &ScoringContext) -> bool + Send + Sync>;

pub type EffectFn = Arc<dyn Fn(&[InterventionTarget]) -> String + Send + Sync>;

/// A scored proposition that passes when its effective score is below `threshold`.
#[derive(Debug, Clone)]
pub struct PropositionalPrecondition {
    pub proposition: Proposition,
    pub threshold: u8,
}

/// Configuration of an intervention, before it is bound to a scorer.
#[derive(Clone)]
pub struct InterventionBuilder {
    intervention_type: String,
    targets: Vec<InterventionTarget>,
    functional: Option<FunctionalPrecondition>,
    textual: Option<String>,
    propositional: Option<PropositionalPrecondition>,
    effect: Option<EffectFn>,
    window: TrajectoryWindow,
}

impl InterventionBuilder {
    pub fn new(intervention_type: impl Into<String>) -> Self {
        Self {
            intervention_type: intervention_type.into(),
            targets: Vec::new(),
            functional: None,
            textual: None,
            propositional: None,
            effect: None,
            window: TrajectoryWindow::default(),
        }
    }

    pub fn target(mut self, target: InterventionTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = InterventionTarget>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn functional<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[InterventionTarget], &ScoringContext) -> bool + Send + Sync + 'static,
    {
        self.functional = Some(Arc::new(predicate));
        self
    }

    pub fn textual(mut self, claim: impl Into<String>) -> Self {
        self.textual = Some(claim.into());
        self
    }

    /// Passes when the effective score is below `threshold` (default 5).
    pub fn propositional(mut self, proposition: Proposition, threshold: Option<u8>) -> Self {
        self.propositional = Some(PropositionalPrecondition {
            proposition,
            threshold: threshold.unwrap_or(DEFAULT_PROPOSITIONAL_THRESHOLD),
        });
        self
    }

    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&[InterventionTarget]) -> String + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    pub fn window(mut self, first_n: usize, last_n: usize) -> Self {
        self.window = TrajectoryWindow::new(first_n, last_n);
        self
    }

    pub fn intervention_type(&self) -> &str {
        &self.intervention_type
    }

    pub fn build(self, scorer: PropositionScorer, log: Arc<dyn InterventionLogStore>) -> Intervention {
        Intervention {
            spec: self,
            scorer,
            log,
        }
    }
}

impl fmt::Debug for InterventionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterventionBuilder")
            .field("intervention_type", &self.intervention_type)
            .field("targets", &self.targets)
            .field("has_functional", &self.functional.is_some())
            .field("textual", &self.textual)
            .field("propositional", &self.propositional)
            .field("has_effect", &self.effect.is_some())
            .field("window", &self.window)
            .finish()
    }
}

/// A configured intervention bound to a scorer and an audit log.
pub struct Intervention {
    spec: InterventionBuilder,
    scorer: PropositionScorer,
    log: Arc<dyn InterventionLogStore>,
}

impl Intervention {
    pub fn targets(&self) -> &[InterventionTarget] {
        &self.spec.targets
    }

    pub fn intervention_type(&self) -> &str {
        &self.spec.intervention_type
    }

    /// Decide whether to fire, and produce the nudge if so.
    ///
    /// The outcome is logged whether or not the intervention fired.
    #[instrument(skip(self, context), fields(intervention = %self.spec.intervention_type))]
    pub async fn evaluate(&self, context: &ScoringContext) -> DomainResult<InterventionResult> {
        let started = Instant::now();
        let windowed = self.spec.window.apply(context);
        let mut results: Vec<PreconditionResult> = Vec::new();

        let all_passed = self.run_preconditions(context, &windowed, &mut results).await?;

        let nudge_text = if all_passed {
            self.spec.effect.as_ref().map(|effect| effect(&self.spec.targets))
        } else {
            None
        };

        let result = InterventionResult {
            fired: all_passed,
            token_usage: results.iter().map(|r| r.token_usage).sum(),
            precondition_results: results,
            nudge_text,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        if result.fired {
            info!(
                evaluated = result.precondition_results.len(),
                tokens = result.token_usage.total(),
                "Intervention fired"
            );
        } else {
            debug!(
                evaluated = result.precondition_results.len(),
                "Intervention did not fire"
            );
        }

        self.record(&result).await;
        Ok(result)
    }

    /// Returns whether every configured precondition passed.
    async fn run_preconditions(
        &self,
        context: &ScoringContext,
        windowed: &ScoringContext,
        results: &mut Vec<PreconditionResult>,
    ) -> DomainResult<bool> {
        if let Some(predicate) = &self.spec.functional {
            let passed = predicate(&self.spec.targets, context);
            results.push(PreconditionResult::functional(passed));
            if !passed {
                return Ok(false);
            }
        }

        if let Some(claim) = &self.spec.textual {
            let proposition = Proposition::new(
                format!("{}_textual", self.spec.intervention_type),
                claim.clone(),
            );
            let check = self.scorer.check(&proposition, windowed).await?;
            results.push(PreconditionResult {
                kind: PreconditionKind::Textual,
                passed: check.result,
                score: None,
                reasoning: Some(check.reasoning),
                token_usage: check.token_usage,
            });
            if !check.result {
                return Ok(false);
            }
        }

        if let Some(spec) = &self.spec.propositional {
            let scored = self
                .scorer
                .score(&spec.proposition, windowed, ScoreOptions::default())
                .await?;
            let score = spec.proposition.effective_score(scored.score);
            let passed = score < spec.threshold;
            results.push(PreconditionResult {
                kind: PreconditionKind::Propositional,
                passed,
                score: Some(score),
                reasoning: Some(scored.reasoning),
                token_usage: scored.token_usage,
            });
            if !passed {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn record(&self, result: &InterventionResult) {
        let record = InterventionLogRecord {
            id: Uuid::new_v4(),
            agent_id: first_target_of(&self.spec.targets, TargetKind::Agent)
                .map(|t| t.id.clone())
                .unwrap_or_default(),
            channel_id: first_target_of(&self.spec.targets, TargetKind::Channel).map(|t| t.id.clone()),
            intervention_type: self.spec.intervention_type.clone(),
            textual_precondition: self.spec.textual.clone(),
            precondition_results: result.precondition_results.clone(),
            fired: result.fired,
            nudge_text: result.nudge_text.clone(),
            token_usage: result.token_usage,
            created_at: Utc::now(),
        };

        if let Err(e) = self.log.record_intervention(&record).await {
            warn!(error = %e, "Failed to write intervention audit log");
        }
    }
}

/// One intervention per agent, sharing a configuration.
pub struct InterventionBatch {
    interventions: Vec<(String, Intervention)>,
}

impl InterventionBatch {
    /// Bind `template` once per agent id. Each intervention targets its agent
    /// first, followed by the template's own targets.
    pub fn new(
        template: &InterventionBuilder,
        agent_ids: impl IntoIterator<Item = impl Into<String>>,
        scorer: &PropositionScorer,
        log: Arc<dyn InterventionLogStore>,
    ) -> Self {
        let interventions = agent_ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                let mut spec = template.clone();
                spec.targets.insert(0, InterventionTarget::agent(id.clone()));
                (id, spec.build(scorer.clone(), log.clone()))
            })
            .collect();

        Self { interventions }
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.interventions.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.interventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interventions.is_empty()
    }

    /// Evaluate every agent with a supplied context, concurrently.
    ///
    /// Agents without a context are skipped. The first error is returned once
    /// all evaluations have finished.
    pub async fn evaluate_all(
        &self,
        contexts: &HashMap<String, ScoringContext>,
    ) -> DomainResult<HashMap<String, InterventionResult>> {
        let evaluations = self.interventions.iter().filter_map(|(id, intervention)| {
            contexts.get(id).map(|context| async move {
                intervention
                    .evaluate(context)
                    .await
                    .map(|result| (id.clone(), result))
            })
        });

        join_all(evaluations).await.into_iter().collect()
    }
}
