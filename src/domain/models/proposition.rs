//! Propositions, trajectories and judge results.
//!
//! A [`Proposition`] is a natural-language claim about an agent's behavior.
//! The judge evaluates it against a [`ScoringContext`], whose trajectory is an
//! ordered interleaving of things the subject did (actions) and things it
//! observed (stimuli).

use std::fmt;
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Highest score on the judge rubric.
pub const MAX_SCORE: u8 = 9;

/// Reasoning attached to results short-circuited by a false precondition.
pub const TRIVIALLY_TRUE_REASONING: &str = "precondition not met (trivially true)";

/// Kind of trajectory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryKind {
    /// Something the subject agent did.
    Action,
    /// Something the subject agent observed.
    Stimulus,
}

/// One step of a conversation trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub kind: TrajectoryKind,
    pub agent_name: String,
    pub text: String,
}

impl TrajectoryEntry {
    pub fn action(agent_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: TrajectoryKind::Action,
            agent_name: agent_name.into(),
            text: text.into(),
        }
    }

    pub fn stimulus(agent_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: TrajectoryKind::Stimulus,
            agent_name: agent_name.into(),
            text: text.into(),
        }
    }

    /// Render the entry in the shape the judge prompts expect.
    pub fn render(&self) -> String {
        match self.kind {
            TrajectoryKind::Action => format!("{} acts: {}", self.agent_name, self.text),
            TrajectoryKind::Stimulus => format!("--> {}: {}", self.agent_name, self.text),
        }
    }
}

/// Format a trajectory for inclusion in a judge prompt, preserving order.
pub fn format_trajectory(entries: &[TrajectoryEntry]) -> String {
    entries
        .iter()
        .map(TrajectoryEntry::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Evidence handed to the judge for a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringContext {
    pub trajectory: Vec<TrajectoryEntry>,
    /// Persona text, injected into the judge's system prompt when present.
    pub persona: Option<String>,
}

impl ScoringContext {
    pub fn new(trajectory: Vec<TrajectoryEntry>) -> Self {
        Self {
            trajectory,
            persona: None,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Same trajectory, persona stripped.
    pub fn without_persona(&self) -> Self {
        Self {
            trajectory: self.trajectory.clone(),
            persona: None,
        }
    }

    pub fn formatted_trajectory(&self) -> String {
        format_trajectory(&self.trajectory)
    }
}

/// Predicate deciding whether a proposition applies to a context at all.
pub type PreconditionFn = Arc<dyn Fn(&ScoringContext) -> bool + Send + Sync>;

/// A behavioral claim to be judged true/false or scored 0-9.
#[derive(Clone)]
pub struct Proposition {
    pub id: String,
    pub claim: String,
    pub weight: f64,
    /// When set, consumers read the final score as `9 - raw`.
    pub inverted: bool,
    precondition: Option<PreconditionFn>,
}

impl Proposition {
    pub fn new(id: impl Into<String>, claim: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            claim: claim.into(),
            weight: 1.0,
            inverted: false,
            precondition: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn(&ScoringContext) -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Arc::new(precondition));
        self
    }

    pub fn has_precondition(&self) -> bool {
        self.precondition.is_some()
    }

    /// True when there is no precondition or the precondition holds.
    pub fn precondition_holds(&self, context: &ScoringContext) -> bool {
        self.precondition.as_ref().is_none_or(|p| p(context))
    }

    /// Apply the inversion flag to a raw judge score.
    pub fn effective_score(&self, raw: u8) -> u8 {
        let raw = raw.min(MAX_SCORE);
        if self.inverted {
            MAX_SCORE - raw
        } else {
            raw
        }
    }
}

impl fmt::Debug for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proposition")
            .field("id", &self.id)
            .field("claim", &self.claim)
            .field("weight", &self.weight)
            .field("inverted", &self.inverted)
            .field("has_precondition", &self.precondition.is_some())
            .finish()
    }
}

/// Token usage reported by the judge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    pub const fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub const fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.input_tokens + rhs.input_tokens,
            self.output_tokens + rhs.output_tokens,
        )
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// Result of scoring a proposition on the 0-9 rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub reasoning: String,
    pub confidence: f64,
    pub token_usage: TokenUsage,
}

impl ScoreResult {
    /// Result used when a precondition does not hold.
    pub fn trivially_true() -> Self {
        Self {
            score: MAX_SCORE,
            reasoning: TRIVIALLY_TRUE_REASONING.to_string(),
            confidence: 1.0,
            token_usage: TokenUsage::zero(),
        }
    }
}

/// Result of a boolean proposition check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub result: bool,
    pub reasoning: String,
    pub confidence: f64,
    pub token_usage: TokenUsage,
}

impl CheckResult {
    pub fn trivially_true() -> Self {
        Self {
            result: true,
            reasoning: TRIVIALLY_TRUE_REASONING.to_string(),
            confidence: 1.0,
            token_usage: TokenUsage::zero(),
        }
    }
}

/// Results of a batched scoring call, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchScoreResult {
    pub results: Vec<ScoreResult>,
    pub token_usage: TokenUsage,
}
