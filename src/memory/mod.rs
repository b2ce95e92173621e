//! Conversation history
//!
//! The calling layer keeps every answered question as a turn and hands a
//! snapshot of all previous turns to each new run. Two backends: process
//! memory and Postgres.

pub mod postgres;
pub mod store;

pub use postgres::PostgresHistoryStore;
pub use store::InMemoryHistoryStore;

use crate::config::AgentConfig;
use crate::models::ConversationTurn;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered store of completed conversation turns
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All turns so far, oldest first.
    async fn snapshot(&self) -> Result<Vec<ConversationTurn>>;

    async fn append(&self, turn: ConversationTurn) -> Result<()>;

    fn backend(&self) -> &'static str;
}

/// Postgres when a database URL is configured, process memory otherwise or
/// when the pool cannot be set up.
pub fn build_history_store(config: &AgentConfig) -> Arc<dyn HistoryStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresHistoryStore::connect_lazy(url) {
            Ok(store) => {
                info!("Conversation history backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres history backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Conversation history backend: in-memory");
    Arc::new(InMemoryHistoryStore::new())
}
