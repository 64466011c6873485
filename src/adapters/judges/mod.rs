//! Judge client implementations.

pub mod anthropic_api;
pub mod mock;

pub use anthropic_api::{AnthropicJudgeClient, AnthropicJudgeConfig, JUDGEMENT_TOOL};
pub use mock::{MockJudgeClient, MockResponse, Responder};
