//! Common test utilities for integration tests
//!
//! Provides shared fixtures and a scripted judge used across
//! multiple integration test files.

#![allow(dead_code)]

use std::sync::Arc;

use parley_judge::adapters::judges::{MockJudgeClient, MockResponse};
use parley_judge::adapters::sqlite::{initialize_database, SqliteAuditLogRepository};
use parley_judge::domain::models::DatabaseConfig;
use parley_judge::domain::ports::JudgeRequest;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Marker that makes the scripted judge score a message as passing.
pub const GOOD_MARKER: &str = "POLISHED";

/// Text the scripted judge returns from a direct correction call.
pub const CORRECTED_TEXT: &str = "POLISHED: I hear you, but the evidence points the other way.";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Whether a judge request is a direct correction rewrite.
pub fn is_correction_request(request: &JudgeRequest) -> bool {
    request.user_prompt.contains("Original message:")
}

/// Judge that scores 8 when the prompt carries [`GOOD_MARKER`], 2 otherwise,
/// and rewrites every correction request to [`CORRECTED_TEXT`].
pub fn scripted_judge() -> MockJudgeClient {
    MockJudgeClient::new().with_responder(|request| {
        if is_correction_request(request) {
            return MockResponse::success(serde_json::json!({ "corrected_text": CORRECTED_TEXT }).to_string());
        }
        if request.user_prompt.contains(GOOD_MARKER) {
            MockResponse::score(8, "reads naturally")
        } else {
            MockResponse::score(2, "stilted and repetitive")
        }
    })
}

/// Migrated on-disk database in a fresh temporary directory.
pub async fn temp_database() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        path: dir.path().join("audit.db").to_string_lossy().into_owned(),
        max_connections: 2,
    };
    let pool = initialize_database(&config).await.expect("Failed to initialize database");
    (dir, pool)
}

pub async fn temp_audit_log() -> (TempDir, Arc<SqliteAuditLogRepository>) {
    let (dir, pool) = temp_database().await;
    (dir, Arc::new(SqliteAuditLogRepository::new(pool)))
}
