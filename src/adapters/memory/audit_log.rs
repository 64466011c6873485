use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CorrectionLogRecord, InterventionLogRecord};
use crate::domain::ports::{CorrectionLogReader, CorrectionLogStore, InterventionLogStore};

/// Append-only audit log held in memory.
///
/// `set_failing(true)` makes every write return a database error, which lets
/// callers exercise their swallow-and-warn path.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    corrections: RwLock<Vec<CorrectionLogRecord>>,
    interventions: RwLock<Vec<InterventionLogRecord>>,
    failing: AtomicBool,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let log = Self::default();
        log.set_failing(true);
        log
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Correction records in write order.
    pub async fn corrections(&self) -> Vec<CorrectionLogRecord> {
        self.corrections.read().await.clone()
    }

    /// Intervention records in write order.
    pub async fn interventions(&self) -> Vec<InterventionLogRecord> {
        self.interventions.read().await.clone()
    }

    fn check_writable(&self) -> DomainResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("audit log unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CorrectionLogStore for InMemoryAuditLog {
    async fn record_correction(&self, record: &CorrectionLogRecord) -> DomainResult<()> {
        self.check_writable()?;
        self.corrections.write().await.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl InterventionLogStore for InMemoryAuditLog {
    async fn record_intervention(&self, record: &InterventionLogRecord) -> DomainResult<()> {
        self.check_writable()?;
        self.interventions.write().await.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl CorrectionLogReader for InMemoryAuditLog {
    async fn list_corrections(
        &self,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<Vec<CorrectionLogRecord>> {
        let corrections = self.corrections.read().await;
        let mut matching: Vec<_> = corrections
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .filter(|r| since.map_or(true, |s| r.created_at >= s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}
