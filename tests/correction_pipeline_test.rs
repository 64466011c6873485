mod common;

use std::sync::Arc;

use parley_judge::adapters::judges::{MockJudgeClient, MockResponse};
use parley_judge::adapters::memory::{InMemoryAuditLog, InMemoryCorrectionStateStore};
use parley_judge::domain::models::{
    Config, CorrectionConfig, CorrectionOutcome, CorrectionRequest, CorrectionStage, GateOptions, QualityDimension,
};
use parley_judge::domain::ports::{CorrectionLogReader, CorrectionStateStore};
use parley_judge::services::{CorrectionPipeline, CorrectionStatsService};
use uuid::Uuid;

use common::{scripted_judge, temp_audit_log, CORRECTED_TEXT};

fn request(run_id: Uuid, text: &str) -> CorrectionRequest {
    CorrectionRequest::new(run_id, "skeptic", text)
        .with_channel("town-square")
        .with_prior_messages(vec!["We should all just agree on the plan.".to_string()])
        .with_prior_action_count(4)
        .with_options(
            GateOptions::default()
                .with_agent_name("Skeptic")
                .with_persona("Questions every claim and asks for evidence."),
        )
}

#[tokio::test]
async fn test_full_correction_lifecycle_is_audited() {
    common::setup_test_logging();
    let (_dir, audit) = temp_audit_log().await;
    let judge = Arc::new(scripted_judge());
    let state = Arc::new(InMemoryCorrectionStateStore::new());
    let pipeline = CorrectionPipeline::from_config(judge.clone(), &Config::default(), state.clone(), audit.clone());
    let run_id = Uuid::new_v4();

    let first = pipeline.process(&request(run_id, "I agree I agree.")).await.unwrap();
    assert_eq!(first.outcome, CorrectionOutcome::RegenerationRequested);
    let feedback = first.feedback.as_ref().unwrap();
    assert_eq!(feedback.attempt_number, 1);
    assert_eq!(feedback.max_attempts, 2);
    assert_eq!(feedback.failed_dimensions.len(), QualityDimension::ALL.len());

    let second = pipeline.process(&request(run_id, "Yes, agreed, agreed.")).await.unwrap();
    assert_eq!(second.outcome, CorrectionOutcome::RegenerationRequested);
    assert_eq!(second.feedback.as_ref().unwrap().attempt_number, 2);

    let third = pipeline.process(&request(run_id, "Agreed, totally agreed.")).await.unwrap();
    assert_eq!(third.outcome, CorrectionOutcome::DirectCorrectionSuccess);
    assert_eq!(third.final_text, CORRECTED_TEXT);
    assert_eq!(third.attempts.len(), 4);
    assert_eq!(third.attempts[3].stage, CorrectionStage::DirectCorrection);
    assert_eq!(state.len().await, 0);

    let records = audit.list_corrections("skeptic", None, 10).await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].outcome, CorrectionOutcome::DirectCorrectionSuccess);
    assert_eq!(records[0].original_text, "I agree I agree.");
    assert_eq!(records[0].run_id, Some(run_id));
    assert_eq!(records[0].channel_id.as_deref(), Some("town-square"));
    assert_eq!(records[0].dimension_scores.len(), QualityDimension::ALL.len());
    assert!(records[0].token_usage.input_tokens > 0);
    assert_eq!(records[2].stage, CorrectionStage::Original);

    let stats = CorrectionStatsService::new(audit.clone())
        .compute("skeptic", None, 100)
        .await
        .unwrap();
    assert_eq!(stats.total_records, 3);
    assert!(stats.first_pass_rate.abs() < f64::EPSILON);
    assert!((stats.regeneration_failure_rate - 1.0).abs() < f64::EPSILON);
    assert!((stats.direct_correction_success_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(stats.forced_through_count, 0);
    assert_eq!(stats.stage(CorrectionStage::Original).unwrap().count, 1);
}

#[tokio::test]
async fn test_forced_through_without_continue_publishes_original() {
    let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::score(1, "off-topic")));
    let audit = Arc::new(InMemoryAuditLog::new());
    let mut config = Config::default();
    config.correction = CorrectionConfig {
        max_correction_attempts: 1,
        regeneration_enabled: false,
        continue_on_failure: false,
        ..CorrectionConfig::default()
    };
    let pipeline = CorrectionPipeline::from_config(
        judge.clone(),
        &config,
        Arc::new(InMemoryCorrectionStateStore::new()),
        audit.clone(),
    );

    let result = pipeline.process(&request(Uuid::new_v4(), "Whatever.")).await.unwrap();

    assert_eq!(result.outcome, CorrectionOutcome::ForcedThrough);
    assert_eq!(result.final_text, "Whatever.");
    assert!(result.best_attempt.is_some());

    let records = audit.corrections().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, CorrectionOutcome::ForcedThrough);
    assert_eq!(records[0].stage, CorrectionStage::DirectCorrection);
}

#[tokio::test]
async fn test_audit_failure_does_not_change_outcome() {
    let judge = Arc::new(scripted_judge());
    let audit = Arc::new(InMemoryAuditLog::failing());
    let pipeline = CorrectionPipeline::from_config(
        judge,
        &Config::default(),
        Arc::new(InMemoryCorrectionStateStore::new()),
        audit.clone(),
    );

    let result = pipeline
        .process(&request(Uuid::new_v4(), "POLISHED: show me the data first."))
        .await
        .unwrap();

    assert_eq!(result.outcome, CorrectionOutcome::Passed);
    assert!(audit.corrections().await.is_empty());
}

#[tokio::test]
async fn test_agents_in_one_run_keep_separate_state() {
    let judge = Arc::new(scripted_judge());
    let state = Arc::new(InMemoryCorrectionStateStore::new());
    let pipeline = CorrectionPipeline::from_config(
        judge,
        &Config::default(),
        state.clone(),
        Arc::new(InMemoryAuditLog::new()),
    );
    let run_id = Uuid::new_v4();

    let skeptic = pipeline.process(&request(run_id, "Fine.")).await.unwrap();
    let optimist = pipeline
        .process(&CorrectionRequest::new(run_id, "optimist", "Great!"))
        .await
        .unwrap();

    assert_eq!(skeptic.outcome, CorrectionOutcome::RegenerationRequested);
    assert_eq!(optimist.outcome, CorrectionOutcome::RegenerationRequested);
    assert_eq!(optimist.feedback.unwrap().attempt_number, 1);
    assert_eq!(state.len().await, 2);

    pipeline.clear_all().await;
    assert_eq!(state.len().await, 0);
}
