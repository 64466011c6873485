//! Jaccard similarity between a proposed message and recent messages.
//!
//! Pure and judge-free.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::models::SimilarityResult;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid non-word regex"));

/// Lower-case, strip punctuation, split on whitespace.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// |A ∩ B| / |A ∪ B|, or 0 when both are empty.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Compare `proposed` against every candidate and keep the closest match.
///
/// Passes when the maximum similarity is at most `threshold`.
pub fn check_action_similarity(
    proposed: &str,
    candidates: &[String],
    threshold: f64,
) -> SimilarityResult {
    let proposed_tokens = tokenize(proposed);

    let mut best: Option<(f64, &String)> = None;
    for candidate in candidates {
        let score = jaccard_similarity(&proposed_tokens, &tokenize(candidate));
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }

    let (score, most_similar_message) = match best {
        Some((score, message)) => (score, Some(message.clone())),
        None => (0.0, None),
    };

    SimilarityResult {
        score,
        passed: score <= threshold,
        threshold,
        most_similar_message,
    }
}
