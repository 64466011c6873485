//! Defensive parsing of judge output.
//!
//! Judge payloads are untrusted. Every response shape (score, check, batch)
//! goes through the same routine: direct JSON decode, then extraction of the
//! first complete JSON value embedded in prose, then a hard failure carrying
//! an excerpt of the raw text.

use serde_json::Value;

use crate::domain::errors::{excerpt, DomainError, DomainResult};
use crate::domain::models::{CheckResult, ScoreResult, TokenUsage, MAX_SCORE};

/// Confidence used when the judge omits it or sends something non-numeric.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Decode a judge payload as JSON, extracting it from surrounding prose if needed.
pub fn parse_json_payload(raw: &str) -> DomainResult<Value> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    extract_json(trimmed).ok_or_else(|| DomainError::response_parse("no JSON found in response", raw))
}

/// Decode the first JSON object or array embedded in text.
///
/// Each `{` or `[` is tried in order; the first position that starts a
/// complete value wins and anything after that value is ignored.
fn extract_json(text: &str) -> Option<Value> {
    text.match_indices(['{', '['])
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
}

/// Parse a single `{score, reasoning, confidence}` response.
pub fn parse_score_response(raw: &str) -> DomainResult<ScoreResult> {
    let value = parse_json_payload(raw)?;
    score_from_value(&value, raw)
}

/// Parse a `{result, reasoning, confidence}` response.
pub fn parse_check_response(raw: &str) -> DomainResult<CheckResult> {
    let value = parse_json_payload(raw)?;

    let result = value
        .get("result")
        .and_then(Value::as_bool)
        .ok_or_else(|| DomainError::InvalidCheckResult {
            excerpt: excerpt(raw),
        })?;

    Ok(CheckResult {
        result,
        reasoning: reasoning_of(&value),
        confidence: confidence_of(&value),
        token_usage: TokenUsage::zero(),
    })
}

/// Parse a batch response of exactly `expected` score entries.
///
/// Accepts a bare array or an object wrapping one (e.g. `{"results": [...]}`).
pub fn parse_batch_response(raw: &str, expected: usize) -> DomainResult<Vec<ScoreResult>> {
    let value = parse_json_payload(raw)?;

    let entries = match &value {
        Value::Array(items) => items,
        Value::Object(map) => ["results", "scores", "items"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .or_else(|| map.values().find_map(Value::as_array))
            .ok_or_else(|| DomainError::response_parse("object does not wrap an array", raw))?,
        _ => return Err(DomainError::response_parse("expected a JSON array", raw)),
    };

    if entries.len() != expected {
        return Err(DomainError::BatchLengthMismatch {
            expected,
            actual: entries.len(),
        });
    }

    entries
        .iter()
        .map(|entry| match entry {
            Value::Number(_) => Ok(ScoreResult {
                score: clamp_score(entry.as_f64().unwrap_or_default()),
                reasoning: String::new(),
                confidence: DEFAULT_CONFIDENCE,
                token_usage: TokenUsage::zero(),
            }),
            _ => score_from_value(entry, raw),
        })
        .collect()
}

fn score_from_value(value: &Value, raw: &str) -> DomainResult<ScoreResult> {
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| DomainError::response_parse("missing numeric score", raw))?;

    Ok(ScoreResult {
        score: clamp_score(score),
        reasoning: reasoning_of(value),
        confidence: confidence_of(value),
        token_usage: TokenUsage::zero(),
    })
}

/// Round to the nearest integer, then clamp into the 0-9 scale.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

pub fn clamp_confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

fn confidence_of(value: &Value) -> f64 {
    clamp_confidence(value.get("confidence").and_then(Value::as_f64))
}

fn reasoning_of(value: &Value) -> String {
    value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
