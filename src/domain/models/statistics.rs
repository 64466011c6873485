//! Statistical result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::correction::CorrectionStage;
use super::quality_gate::QualityDimension;

/// Welch's two-sample t-test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub significant: bool,
    pub mean_a: f64,
    pub mean_b: f64,
    pub sd_a: f64,
    pub sd_b: f64,
}

/// Treatment-versus-control comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceReport {
    pub t_test: TTestResult,
    pub cohens_d: f64,
}

/// Count, mean and sample SD of a set of scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub standard_deviation: f64,
}

/// Failure count and mean score for one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionStats {
    pub evaluations: usize,
    pub failures: usize,
    pub mean_score: f64,
}

/// Rollup of historical correction logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStatistics {
    pub total_records: usize,
    pub first_pass_rate: f64,
    pub regeneration_success_rate: f64,
    pub regeneration_failure_rate: f64,
    pub direct_correction_success_rate: f64,
    pub direct_correction_failure_rate: f64,
    pub forced_through_count: usize,
    pub stage_scores: BTreeMap<String, ScoreSummary>,
    pub dimension_stats: BTreeMap<QualityDimension, DimensionStats>,
    pub similarity_failures: usize,
}

impl CorrectionStatistics {
    pub fn stage(&self, stage: CorrectionStage) -> Option<&ScoreSummary> {
        self.stage_scores.get(stage.as_str())
    }
}
