pub mod audit;
pub mod config;
pub mod correction;
pub mod intervention;
pub mod proposition;
pub mod quality_gate;
pub mod statistics;

pub use audit::{
    CorrectionLogRecord, DimensionScore, EvaluationRun, InterventionLogRecord, RunStatus,
};
pub use config::{
    Config, DatabaseConfig, InterventionSettings, JudgeConfig, LoggingConfig,
};
pub use correction::{
    CorrectionAttempt, CorrectionConfig, CorrectionKey, CorrectionOutcome, CorrectionRequest,
    CorrectionResult, CorrectionStage, CorrectionState, FailedDimension, RegenerationFeedback,
};
pub use intervention::{
    first_target_of, InterventionResult, InterventionTarget, PreconditionKind,
    PreconditionResult, TargetKind, TrajectoryWindow,
};
pub use proposition::{
    format_trajectory, BatchScoreResult, CheckResult, PreconditionFn, Proposition,
    ScoreResult, ScoringContext, TokenUsage, TrajectoryEntry, TrajectoryKind, MAX_SCORE,
    TRIVIALLY_TRUE_REASONING,
};
pub use quality_gate::{
    DimensionConfig, DimensionResult, GateConfig, GateOptions, GateResult, QualityDimension,
    SimilarityConfig, SimilarityResult,
};
pub use statistics::{
    CorrectionStatistics, DimensionStats, ScoreSummary, SignificanceReport, TTestResult,
};
