//! Postgres-backed conversation history

use super::HistoryStore;
use crate::error::PipelineError;
use crate::models::ConversationTurn;
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

pub struct PostgresHistoryStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Build a pool without opening a connection; the first query connects.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;
        Ok(Self::new(pool))
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_turns (
                      turn_seq BIGSERIAL PRIMARY KEY,
                      turn_id UUID NOT NULL UNIQUE,
                      user_text TEXT NOT NULL,
                      assistant_text TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PipelineError::History(format!(
                    "Failed to initialize conversation history schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn snapshot(&self) -> Result<Vec<ConversationTurn>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT user_text, assistant_text
            FROM conversation_turns
            ORDER BY turn_seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            PipelineError::History(format!("Failed to load conversation history: {}", e))
        })?;

        let turns = rows
            .into_iter()
            .map(|row| {
                Ok(ConversationTurn {
                    user: row.try_get("user_text")?,
                    assistant: row.try_get("assistant_text")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        debug!(turns = turns.len(), "Conversation history loaded");
        Ok(turns)
    }

    async fn append(&self, turn: ConversationTurn) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO conversation_turns (turn_id, user_text, assistant_text)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&turn.user)
        .bind(&turn.assistant)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            PipelineError::History(format!("Failed to insert conversation turn: {}", e))
        })?;

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
