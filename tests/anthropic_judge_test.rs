use std::sync::Arc;

use mockito::Matcher;
use parley_judge::adapters::judges::{AnthropicJudgeClient, AnthropicJudgeConfig, JUDGEMENT_TOOL};
use parley_judge::domain::errors::DomainError;
use parley_judge::domain::models::{Proposition, ScoringContext, TrajectoryEntry};
use parley_judge::services::{PropositionScorer, ScoreOptions, ScorerConfig};
use serde_json::json;

fn client(base_url: &str) -> AnthropicJudgeClient {
    AnthropicJudgeClient::new(
        AnthropicJudgeConfig::default()
            .with_api_key("test-key")
            .with_base_url(base_url),
    )
    .unwrap()
}

fn context() -> ScoringContext {
    ScoringContext::new(vec![
        TrajectoryEntry::stimulus("optimist", "This plan cannot fail."),
        TrajectoryEntry::action("skeptic", "Every plan can fail. What is the evidence?"),
    ])
}

#[tokio::test]
async fn test_score_through_forced_tool_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "tool_choice": { "type": "tool", "name": JUDGEMENT_TOOL },
            "temperature": 0.0
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-5-haiku-latest",
                "stop_reason": "tool_use",
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_01",
                    "name": JUDGEMENT_TOOL,
                    "input": { "score": 8, "reasoning": "asks for evidence", "confidence": 0.85 }
                }],
                "usage": { "input_tokens": 412, "output_tokens": 37 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let scorer = PropositionScorer::new(Arc::new(client(&server.url())), ScorerConfig::default());
    let result = scorer
        .score(
            &Proposition::new("skeptical", "The skeptic challenges the claim."),
            &context(),
            ScoreOptions::default(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.score, 8);
    assert_eq!(result.reasoning, "asks for evidence");
    assert!((result.confidence - 0.85).abs() < 1e-9);
    assert_eq!(result.token_usage.input_tokens, 412);
    assert_eq!(result.token_usage.output_tokens, 37);
}

#[tokio::test]
async fn test_plain_text_answer_falls_back_to_json_extraction() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_02",
                "model": "claude-3-5-haiku-latest",
                "stop_reason": "end_turn",
                "content": [{
                    "type": "text",
                    "text": "Sure. {\"result\": true, \"reasoning\": \"they agree\"} Hope that helps."
                }],
                "usage": { "input_tokens": 200, "output_tokens": 20 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let scorer = PropositionScorer::new(Arc::new(client(&server.url())), ScorerConfig::default());
    let check = scorer
        .check(&Proposition::new("agree", "The agents agree."), &context())
        .await
        .unwrap();

    assert!(check.result);
    assert_eq!(check.reasoning, "they agree");
}

#[tokio::test]
async fn test_provider_error_is_judge_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(529)
        .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
        .create_async()
        .await;

    let scorer = PropositionScorer::new(Arc::new(client(&server.url())), ScorerConfig::default());
    let err = scorer
        .score(
            &Proposition::new("skeptical", "The skeptic challenges the claim."),
            &context(),
            ScoreOptions::default(),
        )
        .await
        .unwrap_err();

    match err {
        DomainError::JudgeFailed(message) => assert!(message.contains("529")),
        other => panic!("expected JudgeFailed, got {other:?}"),
    }
}
