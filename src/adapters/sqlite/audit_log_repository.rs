//! SQLite audit log for correction and intervention decisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{parse_datetime, parse_json_or_default, parse_optional_uuid, parse_uuid, to_db_int, to_db_timestamp};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CorrectionLogRecord, CorrectionOutcome, CorrectionStage, InterventionLogRecord, TokenUsage,
};
use crate::domain::ports::{CorrectionLogReader, CorrectionLogStore, InterventionLogStore};

#[derive(Clone)]
pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_interventions(&self, agent_id: &str, limit: usize) -> DomainResult<Vec<InterventionLogRecord>> {
        let rows: Vec<InterventionLogRow> = sqlx::query_as(
            r#"SELECT id, agent_id, channel_id, intervention_type, textual_precondition, precondition_results,
                      fired, nudge_text, input_tokens, output_tokens, created_at
               FROM intervention_logs WHERE agent_id = ?
               ORDER BY created_at DESC LIMIT ?"#,
        )
        .bind(agent_id)
        .bind(to_db_int(limit as u64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl CorrectionLogStore for SqliteAuditLogRepository {
    async fn record_correction(&self, record: &CorrectionLogRecord) -> DomainResult<()> {
        let dimension_scores_json = serde_json::to_string(&record.dimension_scores)?;

        sqlx::query(
            r#"INSERT INTO correction_logs (id, agent_id, run_id, channel_id, original_text, final_text, stage,
                   attempt_number, outcome, dimension_scores, similarity_score, total_score,
                   input_tokens, output_tokens, duration_ms, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.agent_id)
        .bind(record.run_id.map(|id| id.to_string()))
        .bind(&record.channel_id)
        .bind(&record.original_text)
        .bind(&record.final_text)
        .bind(record.stage.as_str())
        .bind(i64::from(record.attempt_number))
        .bind(record.outcome.as_str())
        .bind(&dimension_scores_json)
        .bind(record.similarity_score)
        .bind(i64::from(record.total_score))
        .bind(to_db_int(record.token_usage.input_tokens))
        .bind(to_db_int(record.token_usage.output_tokens))
        .bind(record.duration_ms.map(to_db_int))
        .bind(to_db_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl InterventionLogStore for SqliteAuditLogRepository {
    async fn record_intervention(&self, record: &InterventionLogRecord) -> DomainResult<()> {
        let results_json = serde_json::to_string(&record.precondition_results)?;

        sqlx::query(
            r#"INSERT INTO intervention_logs (id, agent_id, channel_id, intervention_type, textual_precondition,
                   precondition_results, fired, nudge_text, input_tokens, output_tokens, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.agent_id)
        .bind(&record.channel_id)
        .bind(&record.intervention_type)
        .bind(&record.textual_precondition)
        .bind(&results_json)
        .bind(record.fired)
        .bind(&record.nudge_text)
        .bind(to_db_int(record.token_usage.input_tokens))
        .bind(to_db_int(record.token_usage.output_tokens))
        .bind(to_db_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CorrectionLogReader for SqliteAuditLogRepository {
    async fn list_corrections(
        &self,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> DomainResult<Vec<CorrectionLogRecord>> {
        let mut query = String::from(
            r#"SELECT id, agent_id, run_id, channel_id, original_text, final_text, stage, attempt_number, outcome,
                      dimension_scores, similarity_score, total_score, input_tokens, output_tokens, duration_ms, created_at
               FROM correction_logs WHERE agent_id = ?"#,
        );
        if since.is_some() {
            query.push_str(" AND created_at >= ?");
        }
        query.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, CorrectionLogRow>(&query).bind(agent_id);
        if let Some(since) = since {
            q = q.bind(to_db_timestamp(since));
        }
        let rows = q.bind(to_db_int(limit as u64)).fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct CorrectionLogRow {
    id: String,
    agent_id: String,
    run_id: Option<String>,
    channel_id: Option<String>,
    original_text: String,
    final_text: String,
    stage: String,
    attempt_number: i64,
    outcome: String,
    dimension_scores: Option<String>,
    similarity_score: Option<f64>,
    total_score: i64,
    input_tokens: i64,
    output_tokens: i64,
    duration_ms: Option<i64>,
    created_at: String,
}

impl TryFrom<CorrectionLogRow> for CorrectionLogRecord {
    type Error = DomainError;

    fn try_from(row: CorrectionLogRow) -> Result<Self, Self::Error> {
        let stage = CorrectionStage::parse_str(&row.stage)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid stage: {}", row.stage)))?;
        let outcome = CorrectionOutcome::parse_str(&row.outcome)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid outcome: {}", row.outcome)))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            agent_id: row.agent_id,
            run_id: parse_optional_uuid(row.run_id)?,
            channel_id: row.channel_id,
            original_text: row.original_text,
            final_text: row.final_text,
            stage,
            attempt_number: u32::try_from(row.attempt_number).unwrap_or_default(),
            outcome,
            dimension_scores: parse_json_or_default(row.dimension_scores)?,
            similarity_score: row.similarity_score,
            total_score: u32::try_from(row.total_score).unwrap_or_default(),
            token_usage: token_usage(row.input_tokens, row.output_tokens),
            duration_ms: row.duration_ms.and_then(|d| u64::try_from(d).ok()),
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InterventionLogRow {
    id: String,
    agent_id: String,
    channel_id: Option<String>,
    intervention_type: String,
    textual_precondition: Option<String>,
    precondition_results: Option<String>,
    fired: bool,
    nudge_text: Option<String>,
    input_tokens: i64,
    output_tokens: i64,
    created_at: String,
}

impl TryFrom<InterventionLogRow> for InterventionLogRecord {
    type Error = DomainError;

    fn try_from(row: InterventionLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            agent_id: row.agent_id,
            channel_id: row.channel_id,
            intervention_type: row.intervention_type,
            textual_precondition: row.textual_precondition,
            precondition_results: parse_json_or_default(row.precondition_results)?,
            fired: row.fired,
            nudge_text: row.nudge_text,
            token_usage: token_usage(row.input_tokens, row.output_tokens),
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

fn token_usage(input: i64, output: i64) -> TokenUsage {
    TokenUsage::new(
        u64::try_from(input).unwrap_or_default(),
        u64::try_from(output).unwrap_or_default(),
    )
}
