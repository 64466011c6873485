mod common;

use std::sync::Arc;

use parley_judge::adapters::judges::{MockJudgeClient, MockResponse};
use parley_judge::adapters::sqlite::SqliteEvaluationRunRepository;
use parley_judge::domain::errors::DomainError;
use parley_judge::domain::models::{Proposition, RunStatus, ScoringContext, TrajectoryEntry};
use parley_judge::domain::ports::EvaluationRunRepository;
use parley_judge::services::{ExperimentEvaluator, PropositionScorer, RunSpec, ScorerConfig};

use common::temp_database;

fn propositions() -> Vec<Proposition> {
    vec![
        Proposition::new("diverse", "The agents express a range of different opinions."),
        Proposition::new("echo", "The agents repeat each other's points.").inverted(),
    ]
}

fn contexts(tag: &str, count: usize) -> Vec<ScoringContext> {
    (0..count)
        .map(|i| {
            ScoringContext::new(vec![
                TrajectoryEntry::action("skeptic", format!("[{tag}] conversation {i} opens.")),
                TrajectoryEntry::stimulus("optimist", "Let's hear every side."),
            ])
        })
        .collect()
}

/// Treatment conversations score well on both claims; control ones poorly.
/// Odd conversations score one point higher on the first claim so neither
/// sample is constant.
fn condition_judge() -> MockJudgeClient {
    MockJudgeClient::new().with_responder(|request| {
        let jitter = request
            .user_prompt
            .split("conversation ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or(0)
            % 2;
        let body = if request.user_prompt.contains("[treatment]") {
            serde_json::json!({ "results": [7 + jitter, 1] })
        } else {
            serde_json::json!({ "results": [2 + jitter, 7] })
        };
        MockResponse::success(body.to_string())
    })
}

#[tokio::test]
async fn test_treatment_and_control_runs_are_compared() {
    let (_dir, pool) = temp_database().await;
    let runs = Arc::new(SqliteEvaluationRunRepository::new(pool));
    let judge = Arc::new(condition_judge());
    let evaluator = ExperimentEvaluator::new(PropositionScorer::new(judge.clone(), ScorerConfig::default()), runs.clone());

    let treatment = evaluator
        .evaluate_run(&RunSpec {
            condition: "treatment".to_string(),
            propositions: propositions(),
            contexts: contexts("treatment", 6),
        })
        .await
        .unwrap();
    let control = evaluator
        .evaluate_run(&RunSpec {
            condition: "control".to_string(),
            propositions: propositions(),
            contexts: contexts("control", 6),
        })
        .await
        .unwrap();

    assert_eq!(treatment.scores.len(), 6);
    assert_eq!(judge.call_count(), 12);
    // Conversation 0: diverse 7, echo raw 1 (effective 8).
    assert!((treatment.scores[0] - 7.5).abs() < 1e-9);
    // Conversation 0: diverse 2, echo raw 7 (effective 2).
    assert!((control.scores[0] - 2.0).abs() < 1e-9);

    for run_id in [treatment.run_id, control.run_id] {
        let run = runs.get(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    let report = ExperimentEvaluator::compare(&treatment, &control);
    assert!(report.t_test.significant);
    assert!(report.t_test.p_value < 0.001);
    assert!(report.t_test.mean_a > report.t_test.mean_b);
    assert!(report.cohens_d > 2.0);
}

#[tokio::test]
async fn test_scoring_failure_marks_run_failed_before_returning() {
    let (_dir, pool) = temp_database().await;
    let runs = Arc::new(SqliteEvaluationRunRepository::new(pool.clone()));
    let judge = Arc::new(MockJudgeClient::new());
    judge.push_response(MockResponse::success(r#"{"results": [5, 5]}"#)).await;
    judge.push_response(MockResponse::failure("provider overloaded")).await;
    let evaluator = ExperimentEvaluator::new(PropositionScorer::new(judge, ScorerConfig::default()), runs);

    let err = evaluator
        .evaluate_run(&RunSpec {
            condition: "treatment".to_string(),
            propositions: propositions(),
            contexts: contexts("treatment", 3),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::JudgeFailed(_)));

    let (status, error): (String, Option<String>) = sqlx::query_as("SELECT status, error FROM evaluation_runs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "failed");
    assert!(error.unwrap().contains("provider overloaded"));
}

#[tokio::test]
async fn test_malformed_batch_is_a_hard_failure() {
    let (_dir, pool) = temp_database().await;
    let runs = Arc::new(SqliteEvaluationRunRepository::new(pool.clone()));
    let judge = Arc::new(MockJudgeClient::with_default_response(MockResponse::success(
        r#"{"results": [5]}"#,
    )));
    let evaluator = ExperimentEvaluator::new(PropositionScorer::new(judge, ScorerConfig::default()), runs);

    let err = evaluator
        .evaluate_run(&RunSpec {
            condition: "control".to_string(),
            propositions: propositions(),
            contexts: contexts("control", 1),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::BatchLengthMismatch { expected: 2, actual: 1 }));

    let (status,): (String,) = sqlx::query_as("SELECT status FROM evaluation_runs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "failed");
}
