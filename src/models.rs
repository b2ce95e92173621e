//! Core data models for the financial statement agent

use crate::state::RetryCounters;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// The five stages of the fixed pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Parse,
    Extract,
    Fetch,
    Clean,
    Answer,
}

impl StageName {
    pub const ALL: [StageName; 5] = [
        StageName::Parse,
        StageName::Extract,
        StageName::Fetch,
        StageName::Clean,
        StageName::Answer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Parse => "parse",
            StageName::Extract => "extract",
            StageName::Fetch => "fetch",
            StageName::Clean => "clean",
            StageName::Answer => "answer",
        }
    }

    /// Stage that follows this one on success; `None` after Answer.
    pub fn next(&self) -> Option<StageName> {
        match self {
            StageName::Parse => Some(StageName::Extract),
            StageName::Extract => Some(StageName::Fetch),
            StageName::Fetch => Some(StageName::Clean),
            StageName::Clean => Some(StageName::Answer),
            StageName::Answer => None,
        }
    }

    /// Only Extract, Clean and Answer may be re-run after a failed check.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StageName::Extract | StageName::Clean | StageName::Answer
        )
    }

    /// User-facing message written by this stage's failure handler.
    pub fn failure_message(&self) -> &'static str {
        match self {
            StageName::Parse => PARSE_FAILURE_MESSAGE,
            _ => NO_DATA_MESSAGE,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const PARSE_FAILURE_MESSAGE: &str = "問題類型錯誤!";
pub const NO_DATA_MESSAGE: &str = "查無相關資料!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Income,
    BalanceSheet,
    Cashflow,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Income => "income",
            StatementKind::BalanceSheet => "balance_sheet",
            StatementKind::Cashflow => "cashflow",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Annual,
    Quarterly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Annual => "annual",
            PeriodType::Quarterly => "quarterly",
        }
    }
}

/// A statement label such as `季度損益表`, split into its kind and period type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementRequest {
    pub kind: StatementKind,
    pub period_type: PeriodType,
}

impl StatementRequest {
    pub fn parse_label(label: &str) -> Option<Self> {
        let period_type = if label.contains("季度") {
            PeriodType::Quarterly
        } else if label.contains("年度") {
            PeriodType::Annual
        } else {
            return None;
        };

        let kind = if label.contains("損益表") {
            StatementKind::Income
        } else if label.contains("資產負債表") {
            StatementKind::BalanceSheet
        } else if label.contains("現金流量表") {
            StatementKind::Cashflow
        } else {
            return None;
        };

        Some(Self { kind, period_type })
    }
}

//
// ================= Conversation =================
//

/// One completed question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user: String,
    pub assistant: String,
}

impl ConversationTurn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }
}

//
// ================= Financial Data =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    pub value: Option<f64>,
}

/// Reported figures of one statement for one ticker at one as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub rows: Vec<LineItem>,
}

impl FinancialSnapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for FinancialSnapshot {
    /// Two-column table: line items on the left, the as-of date as the
    /// value column header.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.as_of.to_string();

        let name_width = self
            .rows
            .iter()
            .map(|r| r.item.chars().count())
            .max()
            .unwrap_or(0);

        let values: Vec<String> = self
            .rows
            .iter()
            .map(|r| match r.value {
                Some(v) => format!("{}", v),
                None => "NaN".to_string(),
            })
            .collect();

        let value_width = values
            .iter()
            .map(|v| v.chars().count())
            .chain(std::iter::once(header.chars().count()))
            .max()
            .unwrap_or(0);

        write!(
            f,
            "{:name_width$}  {:>value_width$}",
            "",
            header,
            name_width = name_width,
            value_width = value_width
        )?;

        for (row, value) in self.rows.iter().zip(&values) {
            write!(
                f,
                "\n{:<name_width$}  {:>value_width$}",
                row.item,
                value,
                name_width = name_width,
                value_width = value_width
            )?;
        }

        Ok(())
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed { stage: StageName },
}

/// Everything a caller gets back from one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub status: RunStatus,
    pub user_input: String,
    pub submitted_at: DateTime<Utc>,
    pub parsed_question: Option<String>,
    pub extracted_fields: Option<String>,
    pub fetched_data: Option<String>,
    pub cleaned_data: Option<String>,
    pub final_output: String,
    pub retry_counters: RetryCounters,
    /// Number of stage executions, retries included.
    pub stage_runs: u32,
    pub reasoning_trace: Vec<String>,
    pub execution_time_ms: u64,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}
