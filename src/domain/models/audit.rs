//! Audit records written by the pipeline and intervention framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::correction::{CorrectionOutcome, CorrectionStage};
use super::intervention::PreconditionResult;
use super::proposition::TokenUsage;
use super::quality_gate::{GateResult, QualityDimension};

/// Dimension score as persisted in a correction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: QualityDimension,
    pub score: u8,
    pub threshold: u8,
    pub passed: bool,
}

impl DimensionScore {
    pub fn from_gate(gate: &GateResult) -> Vec<Self> {
        gate.dimension_results
            .iter()
            .map(|d| Self {
                dimension: d.dimension,
                score: d.score,
                threshold: d.threshold,
                passed: d.passed,
            })
            .collect()
    }
}

/// One persisted pipeline decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionLogRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub run_id: Option<Uuid>,
    pub channel_id: Option<String>,
    pub original_text: String,
    pub final_text: String,
    pub stage: CorrectionStage,
    pub attempt_number: u32,
    pub outcome: CorrectionOutcome,
    pub dimension_scores: Vec<DimensionScore>,
    pub similarity_score: Option<f64>,
    pub total_score: u32,
    pub token_usage: TokenUsage,
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// One persisted intervention evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionLogRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub channel_id: Option<String>,
    pub intervention_type: String,
    pub textual_precondition: Option<String>,
    pub precondition_results: Vec<PreconditionResult>,
    pub fired: bool,
    pub nudge_text: Option<String>,
    pub token_usage: TokenUsage,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an aggregate evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// An aggregate scoring run over one experiment condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub id: Uuid,
    pub condition: String,
    pub status: RunStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvaluationRun {
    pub fn start(condition: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            condition: condition.into(),
            status: RunStatus::Running,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}
