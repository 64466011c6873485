//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - JudgeClient: structured calls to the judge model
//! - CorrectionLogStore / InterventionLogStore / CorrectionLogReader: audit logs
//! - CorrectionStateStore: in-flight retry state of the correction pipeline
//! - EvaluationRunRepository: aggregate evaluation runs
//!
//! These traits keep the services independent of specific infrastructure.

pub mod audit_log;
pub mod correction_state_store;
pub mod evaluation_run_repository;
pub mod judge_client;

pub use audit_log::{CorrectionLogReader, CorrectionLogStore, InterventionLogStore};
pub use correction_state_store::CorrectionStateStore;
pub use evaluation_run_repository::EvaluationRunRepository;
pub use judge_client::{JudgeClient, JudgeRequest, JudgeResponse};
