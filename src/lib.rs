//! Financial Statement Agent
//!
//! Answers natural-language questions about company financial statements:
//! - Rewrites the question into a precise, self-contained form
//! - Extracts companies, periods and statement types
//! - Fetches the matching statements from a financial data source
//! - Filters the data down to what the question needs
//! - Writes a Markdown answer
//!
//! Every stage output is checked before the run moves on; extract, clean
//! and answer are retried a bounded number of times.
//!
//! PIPELINE:
//! PARSE → EXTRACT → FETCH → CLEAN → ANSWER

pub mod api;
pub mod completion;
pub mod config;
pub mod error;
pub mod market_data;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod stages;
pub mod state;
pub mod verification;

#[cfg(test)]
mod testing;

pub use error::{PipelineError, Result};

// Re-export common types
pub use models::*;
pub use pipeline::WorkflowEngine;
pub use state::{PipelineState, RetryCounters};
