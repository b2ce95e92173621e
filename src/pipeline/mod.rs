//! Workflow engine, router and retry policy.

pub mod engine;
pub mod retry;
pub mod router;

pub use engine::WorkflowEngine;
pub use retry::{RetryDecision, RetryPolicy, DEFAULT_MAX_RETRIES};
pub use router::{route, Route};

use crate::completion::GroqClient;
use crate::config::AgentConfig;
use crate::market_data::{FinancialDataPort, HttpFinancialDataClient, InMemoryFinancialData};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Engine wired to the live completion service and the configured data
/// source. Without `FINANCIAL_API_BASE_URL` every lookup comes back empty.
pub fn build_engine(config: &AgentConfig) -> Result<WorkflowEngine> {
    let completion = Arc::new(GroqClient::from_config(config)?);

    let data: Arc<dyn FinancialDataPort> = match HttpFinancialDataClient::from_config(config)? {
        Some(client) => {
            info!(base_url = ?config.financial_api_base_url, "Financial data source: http");
            Arc::new(client)
        }
        None => {
            warn!("FINANCIAL_API_BASE_URL not set - using an empty in-memory data source");
            Arc::new(InMemoryFinancialData::new())
        }
    };

    Ok(WorkflowEngine::new(completion, data)
        .with_retry_policy(RetryPolicy::new(config.max_retries)))
}
