//! Keyed store for in-flight correction state.

use async_trait::async_trait;

use crate::domain::models::{CorrectionKey, CorrectionState};

/// Holds per-(run, agent) retry state between pipeline invocations.
///
/// Not safe for two callers driving the same key at once; one agent speaks
/// at a time within a run.
#[async_trait]
pub trait CorrectionStateStore: Send + Sync {
    async fn load(&self, key: &CorrectionKey) -> Option<CorrectionState>;

    async fn save(&self, key: &CorrectionKey, state: CorrectionState);

    async fn clear(&self, key: &CorrectionKey);

    async fn clear_all(&self);

    async fn len(&self) -> usize;
}
