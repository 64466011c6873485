//! Audit log ports.
//!
//! Writers are fire-and-forget from the core's perspective: callers swallow
//! and log any error these return.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{CorrectionLogRecord, InterventionLogRecord};

#[async_trait]
pub trait CorrectionLogStore: Send + Sync {
    async fn record_correction(&self, record: &CorrectionLogRecord) -> DomainResult<()>;
}

#[async_trait]
pub trait InterventionLogStore: Send + Sync {
    async fn record_intervention(&self, record: &InterventionLogRecord) -> DomainResult<()>;
}

/// Read side used by the statistics rollup.
#[async_trait]
pub trait CorrectionLogReader: Send + Sync {
    /// Most recent records for an agent, newest first.
    async fn list_corrections(
        &self,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<Vec<CorrectionLogRecord>>;
}
