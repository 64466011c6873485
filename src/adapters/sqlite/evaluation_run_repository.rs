//! SQLite implementation of the EvaluationRunRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_optional_datetime, parse_uuid, to_db_timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EvaluationRun, RunStatus};
use crate::domain::ports::EvaluationRunRepository;

#[derive(Clone)]
pub struct SqliteEvaluationRunRepository {
    pool: SqlitePool,
}

impl SqliteEvaluationRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn finish(&self, id: Uuid, status: RunStatus, error: Option<&str>) -> DomainResult<()> {
        let result = sqlx::query("UPDATE evaluation_runs SET status = ?, error = ?, completed_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(error)
            .bind(to_db_timestamp(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::RunNotFound(id));
        }

        Ok(())
    }
}

#[async_trait]
impl EvaluationRunRepository for SqliteEvaluationRunRepository {
    async fn create(&self, run: &EvaluationRun) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO evaluation_runs (id, condition, status, error, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(&run.condition)
        .bind(run.status.as_str())
        .bind(&run.error)
        .bind(to_db_timestamp(run.started_at))
        .bind(run.completed_at.map(to_db_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<EvaluationRun>> {
        let row: Option<EvaluationRunRow> = sqlx::query_as(
            "SELECT id, condition, status, error, started_at, completed_at FROM evaluation_runs WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn mark_completed(&self, id: Uuid) -> DomainResult<()> {
        self.finish(id, RunStatus::Completed, None).await
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> DomainResult<()> {
        self.finish(id, RunStatus::Failed, Some(error)).await
    }
}

#[derive(sqlx::FromRow)]
struct EvaluationRunRow {
    id: String,
    condition: String,
    status: String,
    error: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl TryFrom<EvaluationRunRow> for EvaluationRun {
    type Error = DomainError;

    fn try_from(row: EvaluationRunRow) -> Result<Self, Self::Error> {
        let status = RunStatus::parse_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            condition: row.condition,
            status,
            error: row.error,
            started_at: parse_datetime(&row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}
