//! Intervention targets, windows and evaluation results.

use serde::{Deserialize, Serialize};

use super::proposition::{ScoringContext, TokenUsage};

/// What an intervention is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Agent,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterventionTarget {
    pub kind: TargetKind,
    pub id: String,
}

impl InterventionTarget {
    pub fn agent(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Agent,
            id: id.into(),
        }
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Channel,
            id: id.into(),
        }
    }
}

/// First target of the given kind.
pub fn first_target_of(targets: &[InterventionTarget], kind: TargetKind) -> Option<&InterventionTarget> {
    targets.iter().find(|t| t.kind == kind)
}

/// Bounds how much trajectory the judge sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryWindow {
    pub first_n: usize,
    pub last_n: usize,
}

impl TrajectoryWindow {
    pub const fn new(first_n: usize, last_n: usize) -> Self {
        Self { first_n, last_n }
    }

    /// Keep the first `first_n` and last `last_n` entries, dropping the middle.
    pub fn apply(&self, context: &ScoringContext) -> ScoringContext {
        let len = context.trajectory.len();
        if len <= self.first_n.saturating_add(self.last_n) {
            return context.clone();
        }
        let mut trajectory = Vec::with_capacity(self.first_n + self.last_n);
        trajectory.extend_from_slice(&context.trajectory[..self.first_n]);
        trajectory.extend_from_slice(&context.trajectory[len - self.last_n..]);
        ScoringContext {
            trajectory,
            persona: context.persona.clone(),
        }
    }
}

impl Default for TrajectoryWindow {
    fn default() -> Self {
        Self::new(5, 15)
    }
}

/// Kind of precondition, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionKind {
    Functional,
    Textual,
    Propositional,
}

impl PreconditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Textual => "textual",
            Self::Propositional => "propositional",
        }
    }
}

/// Outcome of one evaluated precondition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreconditionResult {
    pub kind: PreconditionKind,
    pub passed: bool,
    /// Effective score for propositional preconditions.
    pub score: Option<u8>,
    pub reasoning: Option<String>,
    pub token_usage: TokenUsage,
}

impl PreconditionResult {
    pub fn functional(passed: bool) -> Self {
        Self {
            kind: PreconditionKind::Functional,
            passed,
            score: None,
            reasoning: None,
            token_usage: TokenUsage::zero(),
        }
    }
}

/// Outcome of evaluating an intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionResult {
    pub fired: bool,
    /// Only the preconditions actually evaluated; short-circuited ones are absent.
    pub precondition_results: Vec<PreconditionResult>,
    pub nudge_text: Option<String>,
    pub token_usage: TokenUsage,
    pub duration_ms: u64,
}
