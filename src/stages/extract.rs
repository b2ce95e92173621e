//! Extract stage: pull tickers, periods and statement kinds out of the
//! rewritten question as three labelled lines.

use super::{require, Stage};
use crate::completion::CompletionPort;
use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct ExtractStage {
    completion: Arc<dyn CompletionPort>,
}

impl ExtractStage {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self { completion }
    }

    fn build_prompt(parsed_question: &str) -> String {
        format!(
            r#"You are a financial analyst. Identify exactly which companies, periods and financial statements the question needs.

Companies:
1. Output the stock ticker of every company the question names or directly requires.
2. Taiwan Stock Exchange listings take the .TW suffix (e.g. TSMC -> 2330.TW).
3. Separate several tickers with ", ". Never guess unrelated tickers.
4. If no company can be determined, output 無相關公司.

Periods:
1. Output each needed year or quarter as YYYY or YYYYQn (e.g. 2024, 2023Q4).
2. Separate several periods with ", ". Never guess unrelated periods.
3. If no period can be determined, output 無相關年份或季度.

Statements:
1. Allowed values: 年度損益表, 季度損益表, 年度資產負債表, 季度資產負債表, 年度現金流量表, 季度現金流量表.
2. Include statements needed directly or to compute a requested ratio, separated by ", ".
3. If no statement can be determined, output 無相關報表.

Output exactly three lines and nothing else:
公司：<tickers or 無相關公司>
時間：<periods or 無相關年份或季度>
報表：<statements or 無相關報表>

Question:
{parsed_question}"#
        )
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> StageName {
        StageName::Extract
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let parsed_question = require(state.parsed_question(), "parsed_question")?;
        let prompt = Self::build_prompt(parsed_question);
        let fields = self.completion.generate(&prompt).await?;

        debug!(fields = %fields, "Fields extracted");

        Ok(state.with_extracted_fields(fields))
    }
}
