//! Answer stage: synthesise the final Markdown answer from the cleaned data.

use super::{require, Stage};
use crate::completion::CompletionPort;
use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct AnswerStage {
    completion: Arc<dyn CompletionPort>,
}

impl AnswerStage {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self { completion }
    }

    fn build_prompt(parsed_question: &str, cleaned_data: &str) -> String {
        format!(
            r#"You are a financial analyst. Answer the question completely and in detail using the data provided.

Rules:
1. Use only the provided data; do not invent figures.
2. Answer in Markdown, in the language of the question.

Question:
{parsed_question}

Data:
{cleaned_data}"#
        )
    }
}

#[async_trait]
impl Stage for AnswerStage {
    fn name(&self) -> StageName {
        StageName::Answer
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let parsed_question = require(state.parsed_question(), "parsed_question")?;
        let cleaned_data = require(state.cleaned_data(), "cleaned_data")?;

        let prompt = Self::build_prompt(parsed_question, cleaned_data);
        let answer = self.completion.generate(&prompt).await?;

        Ok(state.with_final_output(answer))
    }
}
