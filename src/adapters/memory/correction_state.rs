use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::{CorrectionKey, CorrectionState};
use crate::domain::ports::CorrectionStateStore;

/// Process-local correction state keyed by (run, agent).
#[derive(Debug, Default)]
pub struct InMemoryCorrectionStateStore {
    states: RwLock<HashMap<CorrectionKey, CorrectionState>>,
}

impl InMemoryCorrectionStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CorrectionStateStore for InMemoryCorrectionStateStore {
    async fn load(&self, key: &CorrectionKey) -> Option<CorrectionState> {
        self.states.read().await.get(key).cloned()
    }

    async fn save(&self, key: &CorrectionKey, state: CorrectionState) {
        self.states.write().await.insert(key.clone(), state);
    }

    async fn clear(&self, key: &CorrectionKey) {
        self.states.write().await.remove(key);
    }

    async fn clear_all(&self) {
        self.states.write().await.clear();
    }

    async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}
