//! Mock judge client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{JudgeClient, JudgeRequest, JudgeResponse};

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Payload text returned to the caller
    pub text: String,
    /// Whether to simulate failure
    pub fail: bool,
    /// Error message if failing
    pub error_message: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: r#"{"score": 9, "reasoning": "mock judgement", "confidence": 1.0}"#.to_string(),
            fail: false,
            error_message: None,
            input_tokens: 100,
            output_tokens: 20,
        }
    }
}

impl MockResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    /// `{score, reasoning, confidence}` payload.
    pub fn score(score: i64, reasoning: &str) -> Self {
        Self::success(
            serde_json::json!({ "score": score, "reasoning": reasoning, "confidence": 0.9 })
                .to_string(),
        )
    }

    /// `{result, reasoning, confidence}` payload.
    pub fn check(result: bool, reasoning: &str) -> Self {
        Self::success(
            serde_json::json!({ "result": result, "reasoning": reasoning, "confidence": 0.9 })
                .to_string(),
        )
    }

    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    fn into_result(self) -> DomainResult<JudgeResponse> {
        if self.fail {
            return Err(DomainError::JudgeFailed(
                self.error_message.unwrap_or_else(|| "Mock failure".to_string()),
            ));
        }
        Ok(JudgeResponse::new(self.text, self.input_tokens, self.output_tokens))
    }
}

/// Computes a response from the request, for tests that route on prompt content.
pub type Responder = Arc<dyn Fn(&JudgeRequest) -> MockResponse + Send + Sync>;

/// Mock judge for testing.
///
/// Queued responses are served first, in order. After that the responder
/// (if any) or the default response answers.
pub struct MockJudgeClient {
    queue: Arc<RwLock<VecDeque<MockResponse>>>,
    default_response: MockResponse,
    responder: Option<Responder>,
    delay: Option<Duration>,
    requests: Arc<RwLock<Vec<JudgeRequest>>>,
    calls: AtomicUsize,
}

impl MockJudgeClient {
    pub fn new() -> Self {
        Self::with_default_response(MockResponse::default())
    }

    pub fn with_default_response(response: MockResponse) -> Self {
        Self {
            queue: Arc::new(RwLock::new(VecDeque::new())),
            default_response: response,
            responder: None,
            delay: None,
            requests: Arc::new(RwLock::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&JudgeRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_response(&self, response: MockResponse) {
        self.queue.write().await.push_back(response);
    }

    pub async fn push_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.queue.write().await.extend(responses);
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<JudgeRequest> {
        self.requests.read().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockJudgeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JudgeClient for MockJudgeClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn invoke(&self, request: JudgeRequest) -> DomainResult<JudgeResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queue.write().await.pop_front();
        let response = match (queued, &self.responder) {
            (Some(response), _) => response,
            (None, Some(responder)) => responder(&request),
            (None, None) => self.default_response.clone(),
        };

        response.into_result()
    }
}
