//! Parse stage: rewrite the raw question into a clear, self-contained one
//! using the submission time and the conversation so far.

use super::Stage;
use crate::completion::CompletionPort;
use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct ParseStage {
    completion: Arc<dyn CompletionPort>,
}

impl ParseStage {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self { completion }
    }

    fn build_prompt(state: &PipelineState) -> String {
        format!(
            r#"You are an editor who rewrites financial questions so they are clear and complete.

Context:
1. Current time: {time}
2. Previous conversation:
{history}

Rules:
1. Rewrite the question so its meaning, grammar and logic are clear.
2. Resolve vague references using the context so the question is concrete and complete.
3. If the question needs a ratio, include the formula.
4. Normalise any time range to years or quarters, e.g. "2024" or "2023Q4".
5. Output only the rewritten question, in the user's language, with no explanation.

Question:
{question}"#,
            time = state.submitted_at().format("%Y-%m-%d %H:%M:%S"),
            history = state.formatted_history(),
            question = state.user_input(),
        )
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn name(&self) -> StageName {
        StageName::Parse
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let prompt = Self::build_prompt(&state);
        let parsed = self.completion.generate(&prompt).await?;

        debug!(parsed_len = parsed.len(), "Question rewritten");

        Ok(state.with_parsed_question(parsed))
    }
}
