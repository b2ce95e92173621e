use financial_statement_agent::{
    api::{start_server, ApiState},
    config::AgentConfig,
    memory::build_history_store,
    pipeline::build_engine,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AgentConfig::from_env()?;

    if config.groq_api_key.is_empty() {
        warn!("GROQ_API_KEY not set in .env - every question will fail at the parse stage");
    }

    info!("Financial Statement Agent - API Server");
    info!(port = config.port, max_retries = config.max_retries, "Configuration loaded");

    let state = ApiState {
        engine: Arc::new(build_engine(&config)?),
        history: build_history_store(&config),
    };

    info!("Workflow engine initialized");

    start_server(state, &config.allowed_origins, config.port).await?;

    Ok(())
}
