//! Rollup of historical correction logs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CorrectionLogRecord, CorrectionOutcome, CorrectionStage, CorrectionStatistics, DimensionStats,
    QualityDimension,
};
use crate::domain::ports::CorrectionLogReader;
use crate::services::statistics::summarize_scores;

/// A logged similarity above this counts as a similarity failure.
pub const SIMILARITY_FAILURE_THRESHOLD: f64 = 0.6;

pub struct CorrectionStatsService {
    reader: Arc<dyn CorrectionLogReader>,
}

impl CorrectionStatsService {
    pub fn new(reader: Arc<dyn CorrectionLogReader>) -> Self {
        Self { reader }
    }

    pub async fn compute(
        &self,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<CorrectionStatistics> {
        let records = self.reader.list_corrections(agent_id, since, limit).await?;
        debug!(agent_id, records = records.len(), "Computing correction statistics");
        Ok(summarize(&records))
    }
}

fn rate(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

pub fn summarize(records: &[CorrectionLogRecord]) -> CorrectionStatistics {
    let in_stage = |stage: CorrectionStage| records.iter().filter(move |r| r.stage == stage);

    let original = in_stage(CorrectionStage::Original).count();
    let first_pass = in_stage(CorrectionStage::Original)
        .filter(|r| r.outcome == CorrectionOutcome::Passed)
        .count();

    let regeneration = in_stage(CorrectionStage::Regeneration).count();
    let regeneration_success = in_stage(CorrectionStage::Regeneration)
        .filter(|r| r.outcome == CorrectionOutcome::RegenerationSuccess)
        .count();

    let direct = in_stage(CorrectionStage::DirectCorrection).count();
    let direct_success = in_stage(CorrectionStage::DirectCorrection)
        .filter(|r| r.outcome == CorrectionOutcome::DirectCorrectionSuccess)
        .count();

    let mut by_stage: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        by_stage
            .entry(record.stage.as_str().to_string())
            .or_default()
            .push(f64::from(record.total_score));
    }

    let mut dimension_scores: BTreeMap<QualityDimension, (usize, Vec<f64>)> = BTreeMap::new();
    for score in records.iter().flat_map(|r| &r.dimension_scores) {
        let entry = dimension_scores.entry(score.dimension).or_default();
        if !score.passed {
            entry.0 += 1;
        }
        entry.1.push(f64::from(score.score));
    }

    CorrectionStatistics {
        total_records: records.len(),
        first_pass_rate: rate(first_pass, original),
        regeneration_success_rate: rate(regeneration_success, regeneration),
        regeneration_failure_rate: rate(regeneration - regeneration_success, regeneration),
        direct_correction_success_rate: rate(direct_success, direct),
        direct_correction_failure_rate: rate(direct - direct_success, direct),
        forced_through_count: records
            .iter()
            .filter(|r| r.outcome == CorrectionOutcome::ForcedThrough)
            .count(),
        stage_scores: by_stage
            .into_iter()
            .map(|(stage, scores)| (stage, summarize_scores(&scores)))
            .collect(),
        dimension_stats: dimension_scores
            .into_iter()
            .map(|(dimension, (failures, scores))| {
                let summary = summarize_scores(&scores);
                (
                    dimension,
                    DimensionStats {
                        evaluations: summary.count,
                        failures,
                        mean_score: summary.mean,
                    },
                )
            })
            .collect(),
        similarity_failures: records
            .iter()
            .filter(|r| r.similarity_score.is_some_and(|s| s > SIMILARITY_FAILURE_THRESHOLD))
            .count(),
    }
}
