use chrono::Utc;
use financial_statement_agent::{config::AgentConfig, pipeline::build_engine};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        eprintln!("usage: statement-agent <question>");
        std::process::exit(2);
    }

    let config = AgentConfig::from_env()?;
    let engine = build_engine(&config)?;

    info!(question = %question, "Running pipeline");

    match engine.run(&question, Vec::new(), Utc::now()).await {
        Ok(outcome) => {
            println!("\n=== ANSWER ===");
            println!("{}", outcome.final_output);
            println!("\nStatus: {:?}", outcome.status);
            println!("Stage runs: {}", outcome.stage_runs);
            println!("\nReasoning Trace:");
            for (i, step) in outcome.reasoning_trace.iter().enumerate() {
                println!("  {}: {}", i + 1, step);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Pipeline run failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
