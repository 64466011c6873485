//! Correction pipeline types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::proposition::TokenUsage;
use super::quality_gate::{DimensionResult, GateOptions, GateResult, QualityDimension, SimilarityResult};

/// Stage that produced a candidate message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStage {
    Original,
    Regeneration,
    DirectCorrection,
}

impl CorrectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Regeneration => "regeneration",
            Self::DirectCorrection => "direct_correction",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Self::Original),
            "regeneration" => Some(Self::Regeneration),
            "direct_correction" => Some(Self::DirectCorrection),
            _ => None,
        }
    }
}

/// Decision reached by one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionOutcome {
    Passed,
    RegenerationRequested,
    RegenerationSuccess,
    DirectCorrectionSuccess,
    ForcedThrough,
}

impl CorrectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::RegenerationRequested => "regeneration_requested",
            Self::RegenerationSuccess => "regeneration_success",
            Self::DirectCorrectionSuccess => "direct_correction_success",
            Self::ForcedThrough => "forced_through",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "regeneration_requested" => Some(Self::RegenerationRequested),
            "regeneration_success" => Some(Self::RegenerationSuccess),
            "direct_correction_success" => Some(Self::DirectCorrectionSuccess),
            "forced_through" => Some(Self::ForcedThrough),
            _ => None,
        }
    }

    /// Terminal outcomes clear the per-agent pipeline state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::RegenerationRequested)
    }
}

/// One evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionAttempt {
    pub stage: CorrectionStage,
    pub attempt_number: u32,
    pub text: String,
    pub gate_result: GateResult,
}

/// A dimension that failed the gate, with the advice handed back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDimension {
    pub dimension: QualityDimension,
    pub score: u8,
    pub threshold: u8,
    pub reasoning: String,
    pub recommendation: String,
}

impl FailedDimension {
    pub fn from_result(result: &DimensionResult) -> Self {
        let template = result.dimension.recommendation();
        let recommendation = if result.reasoning.trim().is_empty() {
            template.to_string()
        } else {
            format!("{template} ({})", result.reasoning.trim())
        };
        Self {
            dimension: result.dimension,
            score: result.score,
            threshold: result.threshold,
            reasoning: result.reasoning.clone(),
            recommendation,
        }
    }

    /// Collect the failing dimensions of a gate result, dropping passing ones.
    pub fn collect(gate_result: &GateResult) -> Vec<Self> {
        gate_result.failed_dimensions().map(Self::from_result).collect()
    }
}

/// Structured rewrite instruction for the acting agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationFeedback {
    pub tentative_action: String,
    pub failed_dimensions: Vec<FailedDimension>,
    /// Set when the message was too close to a recent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<SimilarityResult>,
    pub attempt_number: u32,
    pub max_attempts: u32,
}

impl RegenerationFeedback {
    pub fn from_gate(
        tentative_action: &str,
        gate_result: &GateResult,
        attempt_number: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            tentative_action: tentative_action.to_string(),
            failed_dimensions: FailedDimension::collect(gate_result),
            similarity: gate_result.failed_similarity().cloned(),
            attempt_number,
            max_attempts,
        }
    }

    /// Human-readable instruction text.
    pub fn instruction(&self) -> String {
        let mut text = format!(
            "Your tentative message did not pass the quality check (attempt {} of {}). Write a new message that fixes the following issues:\n",
            self.attempt_number, self.max_attempts
        );
        for failed in &self.failed_dimensions {
            text.push_str(&format!(
                "- {} (score {}/9, needs {}): {}\n",
                failed.dimension, failed.score, failed.threshold, failed.recommendation
            ));
        }
        if let Some(similarity) = &self.similarity {
            text.push_str(&similarity_issue(similarity));
            text.push('\n');
        }
        if self.attempt_number > 1 {
            text.push_str(
                "Previous rewrites were not different enough. Make more radical changes than in your previous attempts: change the content and structure of the message, not just its wording.\n",
            );
        }
        text
    }

    /// The fixed JSON envelope callers hand back to the acting agent.
    pub fn to_envelope(&self) -> serde_json::Value {
        let failed: Vec<serde_json::Value> = self
            .failed_dimensions
            .iter()
            .map(|f| {
                serde_json::json!({
                    "dimension": f.dimension.as_str(),
                    "score": f.score,
                    "threshold": f.threshold,
                    "reasoning": f.reasoning,
                    "recommendation": f.recommendation,
                })
            })
            .collect();

        serde_json::json!({
            "type": "quality_check_failed",
            "tentativeAction": self.tentative_action,
            "failedDimensions": failed,
            "instruction": self.instruction(),
        })
    }
}

/// One-line description of a failed similarity check.
pub fn similarity_issue(similarity: &SimilarityResult) -> String {
    let mut line = format!(
        "- similarity (overlap {:.2}, must be at most {:.2}): the message repeats a recent one. Say something new.",
        similarity.score, similarity.threshold
    );
    if let Some(message) = &similarity.most_similar_message {
        line.push_str(&format!(" Closest earlier message: \"{message}\""));
    }
    line
}

/// Pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Budget for each corrective stage.
    pub max_correction_attempts: u32,
    pub regeneration_enabled: bool,
    pub direct_correction_enabled: bool,
    /// When exhausted, publish the best attempt instead of the original text.
    pub continue_on_failure: bool,
    /// Skip evaluation until the agent has taken this many actions.
    pub min_actions_before_evaluation: u32,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_correction_attempts: 2,
            regeneration_enabled: true,
            direct_correction_enabled: true,
            continue_on_failure: true,
            min_actions_before_evaluation: 0,
        }
    }
}

/// One pipeline invocation's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    pub run_id: Uuid,
    pub agent_id: String,
    pub channel_id: Option<String>,
    /// Candidate message to evaluate.
    pub text: String,
    /// Prior conversation snippets, oldest first.
    pub prior_messages: Vec<String>,
    /// Number of actions the agent has taken so far in the run.
    pub prior_action_count: u32,
    pub options: GateOptions,
}

impl CorrectionRequest {
    pub fn new(run_id: Uuid, agent_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            run_id,
            agent_id: agent_id.into(),
            channel_id: None,
            text: text.into(),
            prior_messages: Vec::new(),
            prior_action_count: 0,
            options: GateOptions::default(),
        }
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_prior_messages(mut self, messages: Vec<String>) -> Self {
        self.prior_messages = messages;
        self
    }

    pub fn with_prior_action_count(mut self, count: u32) -> Self {
        self.prior_action_count = count;
        self
    }

    pub fn with_options(mut self, options: GateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state_key(&self) -> CorrectionKey {
        CorrectionKey::new(self.run_id, self.agent_id.clone())
    }
}

/// Key of the per-agent pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrectionKey {
    pub run_id: Uuid,
    pub agent_id: String,
}

impl CorrectionKey {
    pub fn new(run_id: Uuid, agent_id: impl Into<String>) -> Self {
        Self {
            run_id,
            agent_id: agent_id.into(),
        }
    }
}

/// Retry state carried across invocations for one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionState {
    pub attempts: Vec<CorrectionAttempt>,
    pub regeneration_count: u32,
    pub direct_correction_count: u32,
    /// First text seen for this key.
    pub original_text: Option<String>,
}

impl CorrectionState {
    pub fn next_attempt_number(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX).saturating_add(1)
    }

    /// Attempt with the highest total score; the earliest wins ties.
    pub fn best_attempt(&self) -> Option<&CorrectionAttempt> {
        self.attempts.iter().fold(None, |best: Option<&CorrectionAttempt>, a| match best {
            Some(b) if b.gate_result.total_score >= a.gate_result.total_score => Some(b),
            _ => Some(a),
        })
    }
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub outcome: CorrectionOutcome,
    /// Text to publish. Meaningless for `RegenerationRequested`.
    pub final_text: String,
    /// Gate result of the last evaluated candidate.
    pub gate_result: GateResult,
    pub feedback: Option<RegenerationFeedback>,
    pub best_attempt: Option<CorrectionAttempt>,
    /// Attempts recorded for this key so far, including this invocation's.
    pub attempts: Vec<CorrectionAttempt>,
    pub token_usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate_with_total(total: u32) -> GateResult {
        GateResult {
            passed: false,
            dimension_results: Vec::new(),
            similarity_result: None,
            total_score: total,
            token_usage: TokenUsage::zero(),
        }
    }

    fn attempt(number: u32, total: u32) -> CorrectionAttempt {
        CorrectionAttempt {
            stage: CorrectionStage::Original,
            attempt_number: number,
            text: format!("attempt {number}"),
            gate_result: gate_with_total(total),
        }
    }

    #[test]
    fn test_best_attempt_prefers_highest_total_then_earliest() {
        let state = CorrectionState {
            attempts: vec![attempt(1, 10), attempt(2, 14), attempt(3, 14)],
            ..Default::default()
        };
        assert_eq!(state.best_attempt().map(|a| a.attempt_number), Some(2));
        assert_eq!(state.next_attempt_number(), 4);
        assert!(CorrectionState::default().best_attempt().is_none());
    }

    #[test]
    fn test_failed_dimension_recommendation_appends_reasoning() {
        let result = DimensionResult {
            dimension: QualityDimension::Fluency,
            score: 3,
            reasoning: "repeats itself".to_string(),
            passed: false,
            threshold: 7,
        };
        let failed = FailedDimension::from_result(&result);
        assert!(failed.recommendation.starts_with(QualityDimension::Fluency.recommendation()));
        assert!(failed.recommendation.ends_with("(repeats itself)"));
    }

    #[test]
    fn test_feedback_escalates_after_first_attempt() {
        let mut feedback = RegenerationFeedback {
            tentative_action: "hello".to_string(),
            failed_dimensions: Vec::new(),
            similarity: None,
            attempt_number: 1,
            max_attempts: 2,
        };
        assert!(!feedback.instruction().contains("more radical"));
        feedback.attempt_number = 2;
        assert!(feedback.instruction().contains("more radical"));
    }

    #[test]
    fn test_similarity_only_failure_still_lists_an_issue() {
        let gate = GateResult {
            passed: false,
            dimension_results: vec![DimensionResult {
                dimension: QualityDimension::Fluency,
                score: 8,
                reasoning: String::new(),
                passed: true,
                threshold: 7,
            }],
            similarity_result: Some(SimilarityResult {
                score: 0.9,
                passed: false,
                threshold: 0.6,
                most_similar_message: Some("I agree with you.".to_string()),
            }),
            total_score: 8,
            token_usage: TokenUsage::zero(),
        };

        let feedback = RegenerationFeedback::from_gate("I agree with you!", &gate, 1, 2);
        assert!(feedback.failed_dimensions.is_empty());
        assert!(feedback.similarity.is_some());

        let instruction = feedback.instruction();
        assert!(instruction.contains("- similarity (overlap 0.90, must be at most 0.60)"));
        assert!(instruction.contains("\"I agree with you.\""));
        assert!(feedback.to_envelope()["instruction"]
            .as_str()
            .is_some_and(|s| s.contains("similarity")));
    }

    #[test]
    fn test_feedback_envelope_shape() {
        let feedback = RegenerationFeedback {
            tentative_action: "hello".to_string(),
            failed_dimensions: vec![FailedDimension {
                dimension: QualityDimension::Suitability,
                score: 2,
                threshold: 7,
                reasoning: "off topic".to_string(),
                recommendation: "stay on topic".to_string(),
            }],
            similarity: None,
            attempt_number: 1,
            max_attempts: 2,
        };
        let envelope = feedback.to_envelope();
        assert_eq!(envelope["type"], "quality_check_failed");
        assert_eq!(envelope["tentativeAction"], "hello");
        assert_eq!(envelope["failedDimensions"][0]["dimension"], "suitability");
        assert!(envelope["instruction"].as_str().is_some_and(|s| s.contains("suitability")));
    }

    #[test]
    fn test_outcome_terminality() {
        assert!(!CorrectionOutcome::RegenerationRequested.is_terminal());
        assert!(CorrectionOutcome::ForcedThrough.is_terminal());
        assert_eq!(
            CorrectionOutcome::parse_str(CorrectionOutcome::DirectCorrectionSuccess.as_str()),
            Some(CorrectionOutcome::DirectCorrectionSuccess)
        );
    }
}
