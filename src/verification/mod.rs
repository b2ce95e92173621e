//! Stage validators
//!
//! A validator looks at the state right after its stage ran and says
//! whether the output is acceptable. Four of the five ask the completion
//! service for a True/False judgement; the fetch check is a presence test.
//! Validators never modify the state.

use crate::completion::CompletionPort;
use crate::models::StageName;
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Boolean acceptance check run after a stage
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, state: &PipelineState) -> Result<bool>;
}

/// A judgement passes only when the reply is exactly `True` (surrounding
/// whitespace ignored).
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim() == "True"
}

const VERDICT_RULE: &str =
    "Reply with exactly one word, True or False, and nothing else.";

/// Sends a judgement prompt and reads the verdict.
struct Judge {
    completion: Arc<dyn CompletionPort>,
}

impl Judge {
    async fn ask(&self, stage: StageName, prompt: String) -> Result<bool> {
        let reply = self.completion.generate(&prompt).await?;
        let verdict = is_affirmative(&reply);
        debug!(stage = %stage, reply = %reply.trim(), verdict, "Validator verdict");
        Ok(verdict)
    }
}

//
// ================= Parse =================
//

pub struct ParseCheck {
    judge: Judge,
}

impl ParseCheck {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            judge: Judge { completion },
        }
    }
}

#[async_trait]
impl Validator for ParseCheck {
    async fn validate(&self, state: &PipelineState) -> Result<bool> {
        let Some(parsed) = state.parsed_question() else {
            return Ok(false);
        };

        let prompt = format!(
            r#"You validate financial-analysis questions. Decide whether the text is a clear, well-defined question about financial statements.

Requirements:
1. It concerns financial statements or financial metrics.
2. It names one or more specific companies.
3. It names one or more specific periods.
4. It is concrete and unambiguous.

{VERDICT_RULE}

Text:
{parsed}"#
        );

        self.judge.ask(StageName::Parse, prompt).await
    }
}

//
// ================= Extract =================
//

pub struct ExtractCheck {
    judge: Judge,
}

impl ExtractCheck {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            judge: Judge { completion },
        }
    }
}

#[async_trait]
impl Validator for ExtractCheck {
    async fn validate(&self, state: &PipelineState) -> Result<bool> {
        let Some(fields) = state.extracted_fields() else {
            return Ok(false);
        };

        let prompt = format!(
            r#"You validate extracted financial-analysis fields. Check the three lines 公司, 時間 and 報表.

Requirements:
1. 公司 is not 無相關公司 and holds valid tickers (e.g. 2330.TW, AAPL).
2. 時間 is not 無相關年份或季度 and holds years (2024) or quarters (2023Q4).
3. 報表 is not 無相關報表 and holds only: 年度損益表, 季度損益表, 年度資產負債表, 季度資產負債表, 年度現金流量表, 季度現金流量表.
4. No typos, stray symbols or unrecognisable content.

{VERDICT_RULE}

Text:
{fields}"#
        );

        self.judge.ask(StageName::Extract, prompt).await
    }
}

//
// ================= Fetch =================
//

/// Fetch cannot fail on content, only on absence of its output.
pub struct FetchPresenceCheck;

#[async_trait]
impl Validator for FetchPresenceCheck {
    async fn validate(&self, state: &PipelineState) -> Result<bool> {
        Ok(state.fetched_data().is_some())
    }
}

//
// ================= Clean =================
//

pub struct CleanCheck {
    judge: Judge,
}

impl CleanCheck {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            judge: Judge { completion },
        }
    }
}

#[async_trait]
impl Validator for CleanCheck {
    async fn validate(&self, state: &PipelineState) -> Result<bool> {
        let (Some(question), Some(cleaned)) = (state.parsed_question(), state.cleaned_data())
        else {
            return Ok(false);
        };

        let prompt = format!(
            r#"You check financial data for completeness. Decide whether the data contains everything needed to answer the question.

Requirements:
1. The data is not 無相關資料.
2. Every figure the answer needs is present, with its table title kept.

{VERDICT_RULE}

Question:
{question}

Data:
{cleaned}"#
        );

        self.judge.ask(StageName::Clean, prompt).await
    }
}

//
// ================= Answer =================
//

pub struct AnswerCheck {
    judge: Judge,
}

impl AnswerCheck {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            judge: Judge { completion },
        }
    }
}

#[async_trait]
impl Validator for AnswerCheck {
    async fn validate(&self, state: &PipelineState) -> Result<bool> {
        let (Some(question), Some(cleaned), Some(answer)) = (
            state.parsed_question(),
            state.cleaned_data(),
            state.final_output(),
        ) else {
            return Ok(false);
        };

        let prompt = format!(
            r#"You check financial answers for correctness. Judge the answer against the question and the data.

Requirements:
1. The answer fully covers the financial information the question asks for.
2. Every figure agrees with the data.
3. The answer is written in Markdown.

{VERDICT_RULE}

Question:
{question}

Data:
{cleaned}

Answer:
{answer}"#
        );

        self.judge.ask(StageName::Answer, prompt).await
    }
}

/// Standard validator for each stage.
pub fn default_validator(
    stage: StageName,
    completion: Arc<dyn CompletionPort>,
) -> Arc<dyn Validator> {
    match stage {
        StageName::Parse => Arc::new(ParseCheck::new(completion)),
        StageName::Extract => Arc::new(ExtractCheck::new(completion)),
        StageName::Fetch => Arc::new(FetchPresenceCheck),
        StageName::Clean => Arc::new(CleanCheck::new(completion)),
        StageName::Answer => Arc::new(AnswerCheck::new(completion)),
    }
}

//
// ================= Tests =================
//
