//! Evaluation run persistence port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::EvaluationRun;

#[async_trait]
pub trait EvaluationRunRepository: Send + Sync {
    async fn create(&self, run: &EvaluationRun) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<EvaluationRun>>;

    async fn mark_completed(&self, id: Uuid) -> DomainResult<()>;

    /// Record the failure so partial state is observable.
    async fn mark_failed(&self, id: Uuid, error: &str) -> DomainResult<()>;
}
