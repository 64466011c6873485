//! Service layer: the judging engines built on the domain ports.

pub mod action_similarity;
pub mod correction_pipeline;
pub mod correction_stats;
pub mod direct_correction;
pub mod experiment_evaluator;
pub mod intervention;
pub mod interventions;
pub mod proposition_scorer;
pub mod quality_gate;
pub mod response_parser;
pub mod statistics;

pub use action_similarity::{check_action_similarity, jaccard_similarity, tokenize};
pub use correction_pipeline::CorrectionPipeline;
pub use correction_stats::{summarize, CorrectionStatsService};
pub use direct_correction::{CorrectionContext, DirectCorrectionResult, DirectCorrector};
pub use experiment_evaluator::{ExperimentEvaluator, RunScores, RunSpec};
pub use intervention::{Intervention, InterventionBatch, InterventionBuilder};
pub use proposition_scorer::{PropositionScorer, ScoreOptions, ScorerConfig, BATCH_CHUNK_SIZE};
pub use quality_gate::QualityGate;
pub use statistics::{
    cohens_d, incomplete_beta, ln_gamma, mean, significance_report, standard_deviation,
    t_distribution_cdf, variance, welch_t_test,
};
