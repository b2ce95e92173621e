//! Clean stage: keep only the fetched rows relevant to the question.

use super::{require, Stage};
use crate::completion::CompletionPort;
use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct CleanStage {
    completion: Arc<dyn CompletionPort>,
}

impl CleanStage {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self { completion }
    }

    fn build_prompt(parsed_question: &str, fetched_data: &str) -> String {
        format!(
            r#"You are a financial analyst. Select the data that is useful for answering the question.

Rules:
1. Keep table titles, e.g. "2330.TW 的 2025Q3 季度損益表".
2. Remove only rows that are clearly unrelated; keep anything that might matter.
3. One row per line.
4. Do not compute anything or add explanations; output the filtered data only.
5. If nothing is relevant, output 無相關資料.

Question:
{parsed_question}

Data:
{fetched_data}"#
        )
    }
}

#[async_trait]
impl Stage for CleanStage {
    fn name(&self) -> StageName {
        StageName::Clean
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let parsed_question = require(state.parsed_question(), "parsed_question")?;
        let fetched_data = require(state.fetched_data(), "fetched_data")?;

        let prompt = Self::build_prompt(parsed_question, fetched_data);
        let cleaned = self.completion.generate(&prompt).await?;

        debug!(
            fetched_len = fetched_data.len(),
            cleaned_len = cleaned.len(),
            "Fetched data filtered"
        );

        Ok(state.with_cleaned_data(cleaned))
    }
}
