use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EvaluationRun;
use crate::domain::ports::EvaluationRunRepository;

#[derive(Debug, Default)]
pub struct InMemoryEvaluationRunRepository {
    runs: RwLock<HashMap<Uuid, EvaluationRun>>,
}

impl InMemoryEvaluationRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<EvaluationRun> {
        let mut runs: Vec<_> = self.runs.read().await.values().cloned().collect();
        runs.sort_by_key(|r| r.started_at);
        runs
    }
}

#[async_trait]
impl EvaluationRunRepository for InMemoryEvaluationRunRepository {
    async fn create(&self, run: &EvaluationRun) -> DomainResult<()> {
        self.runs.write().await.insert(run.id, run.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<EvaluationRun>> {
        Ok(self.runs.read().await.get(&id).cloned())
    }

    async fn mark_completed(&self, id: Uuid) -> DomainResult<()> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(DomainError::RunNotFound(id))?;
        run.complete();
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> DomainResult<()> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or(DomainError::RunNotFound(id))?;
        run.fail(error);
        Ok(())
    }
}
