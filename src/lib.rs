//! Parley Judge - LLM-judged quality control for agent conversations
//!
//! Parley Judge scores natural-language propositions about a conversation
//! with an LLM judge, and builds on that primitive:
//!
//! - a multi-dimension quality gate with a lexical similarity check
//! - a per-(run, agent) correction pipeline: regenerate, rewrite, or force through
//! - precondition-gated interventions that nudge agents mid-conversation
//! - Welch's t-test and Cohen's d for comparing experiment conditions
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): the judging engines
//! - **Adapters** (`adapters`): Anthropic and mock judges, SQLite and in-memory stores
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use parley_judge::adapters::judges::{AnthropicJudgeClient, AnthropicJudgeConfig};
//! use parley_judge::{ConfigLoader, PropositionScorer, Proposition, ScoringContext, TrajectoryEntry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let judge = Arc::new(AnthropicJudgeClient::new(AnthropicJudgeConfig::from(&config.judge))?);
//!     let scorer = PropositionScorer::new(judge, (&config.judge).into());
//!
//!     let context = ScoringContext::new(vec![TrajectoryEntry::action("Skeptic", "I doubt it.")]);
//!     let result = scorer
//!         .score(&Proposition::new("doubt", "Skeptic expresses doubt."), &context, Default::default())
//!         .await?;
//!     println!("{} ({})", result.score, result.reasoning);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, CorrectionConfig, CorrectionOutcome, CorrectionRequest, CorrectionResult, CorrectionStage,
    GateConfig, GateResult, Proposition, QualityDimension, ScoreResult, ScoringContext, TrajectoryEntry,
};
pub use domain::ports::{
    CorrectionLogReader, CorrectionLogStore, CorrectionStateStore, EvaluationRunRepository, InterventionLogStore,
    JudgeClient,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    CorrectionPipeline, CorrectionStatsService, DirectCorrector, ExperimentEvaluator, Intervention,
    InterventionBatch, InterventionBuilder, PropositionScorer, QualityGate,
};
