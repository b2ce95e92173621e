//! Pipeline stages
//!
//! Each stage takes the current state by value, does its delegated work
//! through a port, and returns the state with exactly one field replaced.
//! Re-running a stage overwrites that field; nothing from an earlier attempt
//! is read back.

use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;

pub mod answer;
pub mod clean;
pub mod extract;
pub mod fetch;
pub mod parse;

pub use answer::AnswerStage;
pub use clean::CleanStage;
pub use extract::ExtractStage;
pub use fetch::FetchStage;
pub use parse::ParseStage;

/// A single step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Errors only when a port fails or a required input field is missing.
    async fn run(&self, state: PipelineState) -> Result<PipelineState>;
}

/// Failure handler: terminal write of the stage's fixed message.
pub fn fail(stage: StageName, state: PipelineState) -> PipelineState {
    state.with_final_output(stage.failure_message().to_string())
}

/// Read a field a stage depends on, or report it as missing.
pub(crate) fn require<'a>(field: Option<&'a str>, name: &'static str) -> Result<&'a str> {
    field.ok_or(crate::error::PipelineError::MissingField(name))
}
