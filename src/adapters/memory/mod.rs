//! In-memory adapters for tests and single-process embedding.

pub mod audit_log;
pub mod correction_state;
pub mod evaluation_runs;

pub use audit_log::InMemoryAuditLog;
pub use correction_state::InMemoryCorrectionStateStore;
pub use evaluation_runs::InMemoryEvaluationRunRepository;
