//! In-process conversation history

use super::HistoryStore;
use crate::models::ConversationTurn;
use crate::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// History kept for the lifetime of the process. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing turns.
    pub fn with_turns(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns: RwLock::new(turns),
        }
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn snapshot(&self) -> Result<Vec<ConversationTurn>> {
        Ok(self.turns.read().await.clone())
    }

    async fn append(&self, turn: ConversationTurn) -> Result<()> {
        self.turns.write().await.push(turn);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "in-memory"
    }
}
