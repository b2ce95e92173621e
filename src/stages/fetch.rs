//! Fetch stage
//!
//! Turns the extracted fields into statement lookups. For every
//! (company, period, statement) triple, in that nesting order, the stage
//! either appends a titled table or a "not found" line. Missing data is
//! content, never an error; only a failing data port aborts the stage.

use super::{require, Stage};
use crate::market_data::FinancialDataPort;
use crate::models::{PeriodType, StageName, StatementRequest};
use crate::state::PipelineState;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPANY_LABEL: &str = "公司";
const PERIOD_LABEL: &str = "時間";
const STATEMENT_LABEL: &str = "報表";

const NO_COMPANY: &str = "無相關公司";
const NO_PERIOD: &str = "無相關年份或季度";
const NO_STATEMENT: &str = "無相關報表";

lazy_static! {
    static ref PERIOD_PATTERN: Regex =
        Regex::new(r"^(\d{4})(?:Q([1-4]))?$").expect("period pattern is valid");
}

//
// ================= Extracted fields =================
//

/// The three lists encoded in `extracted_fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub companies: Vec<String>,
    pub periods: Vec<String>,
    pub statements: Vec<String>,
}

impl ExtractedFields {
    /// Scan for the labelled lines. A missing line or a "none" sentinel
    /// leaves that list empty; when a label repeats, the last line wins.
    pub fn parse(text: &str) -> Self {
        let mut fields = Self::default();

        for line in text.lines().map(str::trim) {
            if let Some(rest) = strip_label(line, COMPANY_LABEL) {
                fields.companies = split_list(rest, NO_COMPANY);
            } else if let Some(rest) = strip_label(line, PERIOD_LABEL) {
                fields.periods = split_list(rest, NO_PERIOD);
            } else if let Some(rest) = strip_label(line, STATEMENT_LABEL) {
                fields.statements = split_list(rest, NO_STATEMENT);
            }
        }

        fields
    }

    pub fn triple_count(&self) -> usize {
        self.companies.len() * self.periods.len() * self.statements.len()
    }
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(label)?;
    rest.strip_prefix('：').or_else(|| rest.strip_prefix(':'))
}

fn split_list(rest: &str, sentinel: &str) -> Vec<String> {
    rest.split([',', '，'])
        .map(str::trim)
        .filter(|item| !item.is_empty() && *item != sentinel)
        .map(str::to_string)
        .collect()
}

//
// ================= Periods =================
//

/// A fiscal year, optionally narrowed to one quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub quarter: Option<u32>,
}

impl Period {
    /// Accepts `YYYY` or `YYYYQn` (n in 1..=4), case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        let caps = PERIOD_PATTERN.captures(&normalized)?;

        let year = caps.get(1)?.as_str().parse().ok()?;
        let quarter = match caps.get(2) {
            Some(q) => Some(q.as_str().parse().ok()?),
            None => None,
        };

        Some(Self { year, quarter })
    }

    pub fn period_type(&self) -> PeriodType {
        if self.quarter.is_some() {
            PeriodType::Quarterly
        } else {
            PeriodType::Annual
        }
    }

    /// Last calendar day of the quarter, or December 31 for a bare year.
    pub fn as_of_date(&self) -> Option<NaiveDate> {
        let (month, day) = match self.quarter {
            Some(1) => (3, 31),
            Some(2) => (6, 30),
            Some(3) => (9, 30),
            _ => (12, 31),
        };
        NaiveDate::from_ymd_opt(self.year, month, day)
    }
}

//
// ================= Stage =================
//

pub struct FetchStage {
    data: Arc<dyn FinancialDataPort>,
}

impl FetchStage {
    pub fn new(data: Arc<dyn FinancialDataPort>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn name(&self) -> StageName {
        StageName::Fetch
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let fields = ExtractedFields::parse(require(
            state.extracted_fields(),
            "extracted_fields",
        )?);

        debug!(
            companies = fields.companies.len(),
            periods = fields.periods.len(),
            statements = fields.statements.len(),
            "Fetching statements"
        );

        let mut result = String::new();
        let mut found = 0usize;
        let mut missing = 0usize;

        for company in &fields.companies {
            for raw_period in &fields.periods {
                for label in &fields.statements {
                    let Some(period) = Period::parse(raw_period) else {
                        warn!(period = %raw_period, "Skipping unrecognised period");
                        continue;
                    };

                    let Some(request) = StatementRequest::parse_label(label) else {
                        warn!(statement = %label, "Skipping unrecognised statement");
                        continue;
                    };

                    if request.period_type != period.period_type() {
                        debug!(
                            company = %company,
                            period = %raw_period,
                            statement = %label,
                            "Skipping period/statement mismatch"
                        );
                        continue;
                    }

                    let Some(as_of) = period.as_of_date() else {
                        warn!(period = %raw_period, "Period has no calendar date");
                        continue;
                    };

                    let snapshot = self
                        .data
                        .fetch(company, as_of, request.kind, request.period_type)
                        .await?;

                    match snapshot {
                        Some(snapshot) if !snapshot.is_empty() => {
                            found += 1;
                            result.push_str(&format!(
                                "{} 的 {} {}\n{}\n\n",
                                company, raw_period, label, snapshot
                            ));
                        }
                        _ => {
                            missing += 1;
                            result.push_str(&format!(
                                "找不到 {} 的 {} {}\n\n",
                                company, raw_period, label
                            ));
                        }
                    }
                }
            }
        }

        info!(found, missing, "Fetch complete");

        Ok(state.with_fetched_data(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{FinancialSnapshot, LineItem, StatementKind};
    use crate::testing::RecordingFinancialData;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state_with_fields(fields: &str) -> PipelineState {
        PipelineState::new("q", vec![], Utc::now()).with_extracted_fields(fields.to_string())
    }

    fn tsmc_q1_income() -> FinancialSnapshot {
        FinancialSnapshot {
            ticker: "2330.TW".to_string(),
            as_of: date(2024, 3, 31),
            rows: vec![
                LineItem {
                    item: "Total Revenue".to_string(),
                    value: Some(592644201000.0),
                },
                LineItem {
                    item: "Net Income".to_string(),
                    value: Some(225485400000.0),
                },
            ],
        }
    }

    #[test]
    fn test_parse_fields() {
        let fields = ExtractedFields::parse(
            "公司：2330.TW, 2454.TW\n時間：2024Q1, 2023\n報表：季度損益表, 年度資產負債表",
        );
        assert_eq!(fields.companies, vec!["2330.TW", "2454.TW"]);
        assert_eq!(fields.periods, vec!["2024Q1", "2023"]);
        assert_eq!(fields.statements, vec!["季度損益表", "年度資產負債表"]);
        assert_eq!(fields.triple_count(), 8);
    }

    #[test]
    fn test_parse_fields_sentinels_and_missing_lines() {
        let fields = ExtractedFields::parse("公司：無相關公司\n時間：2024");
        assert!(fields.companies.is_empty());
        assert_eq!(fields.periods, vec!["2024"]);
        assert!(fields.statements.is_empty());
        assert_eq!(fields.triple_count(), 0);
    }

    #[test]
    fn test_parse_fields_tolerates_indent_and_ascii_colon() {
        let fields = ExtractedFields::parse("  公司: AAPL ,\n    時間：2024Q4\n報表：季度現金流量表");
        assert_eq!(fields.companies, vec!["AAPL"]);
        assert_eq!(fields.periods, vec!["2024Q4"]);
        assert_eq!(fields.statements, vec!["季度現金流量表"]);
    }

    #[test]
    fn test_quarter_dates() {
        let cases = [
            ("2024Q1", date(2024, 3, 31)),
            ("2024Q2", date(2024, 6, 30)),
            ("2024Q3", date(2024, 9, 30)),
            ("2024Q4", date(2024, 12, 31)),
            ("2023", date(2023, 12, 31)),
            ("2022q3", date(2022, 9, 30)),
        ];
        for (raw, expected) in cases {
            let period = Period::parse(raw).unwrap();
            assert_eq!(period.as_of_date(), Some(expected), "{}", raw);
        }
        assert_eq!(Period::parse("2023").unwrap().period_type(), PeriodType::Annual);
        assert_eq!(Period::parse("2023Q2").unwrap().period_type(), PeriodType::Quarterly);
    }

    #[test]
    fn test_invalid_periods() {
        for raw in ["2024Q5", "24Q1", "2024H1", "Q1 2024", ""] {
            assert!(Period::parse(raw).is_none(), "{}", raw);
        }
    }

    #[tokio::test]
    async fn test_fetch_found_block() {
        let data = Arc::new(RecordingFinancialData::new().with_snapshot(
            StatementKind::Income,
            PeriodType::Quarterly,
            tsmc_q1_income(),
        ));
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields("公司：2330.TW\n時間：2024Q1\n報表：季度損益表"))
            .await
            .unwrap();

        let fetched = state.fetched_data().unwrap();
        assert!(fetched.starts_with("2330.TW 的 2024Q1 季度損益表\n"));
        assert!(fetched.contains("Total Revenue"));
        assert!(fetched.ends_with("\n\n"));
        assert!(!fetched.contains("找不到"));
        assert_eq!(
            data.calls(),
            vec![(
                "2330.TW".to_string(),
                date(2024, 3, 31),
                StatementKind::Income,
                PeriodType::Quarterly
            )]
        );
    }

    #[tokio::test]
    async fn test_fetch_not_found_placeholder() {
        let data = Arc::new(RecordingFinancialData::new());
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields("公司：2330.TW\n時間：2024Q1\n報表：季度損益表"))
            .await
            .unwrap();

        assert_eq!(
            state.fetched_data(),
            Some("找不到 2330.TW 的 2024Q1 季度損益表\n\n")
        );
        assert_eq!(data.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_empty_snapshot_is_not_found() {
        let mut empty = tsmc_q1_income();
        empty.rows.clear();
        let data = Arc::new(RecordingFinancialData::new().with_snapshot(
            StatementKind::Income,
            PeriodType::Quarterly,
            empty,
        ));
        let stage = FetchStage::new(data);

        let state = stage
            .run(state_with_fields("公司：2330.TW\n時間：2024Q1\n報表：季度損益表"))
            .await
            .unwrap();

        assert!(state.fetched_data().unwrap().starts_with("找不到"));
    }

    #[tokio::test]
    async fn test_fetch_iteration_order() {
        let data = Arc::new(RecordingFinancialData::new());
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields(
                "公司：2330.TW, 2454.TW\n時間：2024Q1, 2024Q2\n報表：季度損益表, 季度資產負債表",
            ))
            .await
            .unwrap();

        let lines: Vec<&str> = state
            .fetched_data()
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .collect();

        assert_eq!(
            lines,
            vec![
                "找不到 2330.TW 的 2024Q1 季度損益表",
                "找不到 2330.TW 的 2024Q1 季度資產負債表",
                "找不到 2330.TW 的 2024Q2 季度損益表",
                "找不到 2330.TW 的 2024Q2 季度資產負債表",
                "找不到 2454.TW 的 2024Q1 季度損益表",
                "找不到 2454.TW 的 2024Q1 季度資產負債表",
                "找不到 2454.TW 的 2024Q2 季度損益表",
                "找不到 2454.TW 的 2024Q2 季度資產負債表",
            ]
        );
        assert_eq!(data.calls().len(), 8);
    }

    #[tokio::test]
    async fn test_fetch_skips_mismatched_triples() {
        let data = Arc::new(RecordingFinancialData::new());
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields(
                "公司：2330.TW\n時間：2024, 2024Q3\n報表：季度損益表, 年度現金流量表",
            ))
            .await
            .unwrap();

        let fetched = state.fetched_data().unwrap();
        assert_eq!(
            fetched,
            "找不到 2330.TW 的 2024 年度現金流量表\n\n找不到 2330.TW 的 2024Q3 季度損益表\n\n"
        );

        let calls = data.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, date(2024, 12, 31));
        assert_eq!(calls[0].3, PeriodType::Annual);
        assert_eq!(calls[1].1, date(2024, 9, 30));
        assert_eq!(calls[1].3, PeriodType::Quarterly);
    }

    #[tokio::test]
    async fn test_fetch_no_triples_still_sets_field() {
        let data = Arc::new(RecordingFinancialData::new());
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields("公司：無相關公司\n時間：無相關年份或季度\n報表：無相關報表"))
            .await
            .unwrap();

        assert_eq!(state.fetched_data(), Some(""));
        assert!(data.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_skips_unknown_period_and_label() {
        let data = Arc::new(RecordingFinancialData::new());
        let stage = FetchStage::new(data.clone());

        let state = stage
            .run(state_with_fields("公司：2330.TW\n時間：2024H1, 2024\n報表：年度股東權益表, 年度損益表"))
            .await
            .unwrap();

        assert_eq!(
            state.fetched_data(),
            Some("找不到 2330.TW 的 2024 年度損益表\n\n")
        );
        assert_eq!(data.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_propagates_port_failure() {
        let data = Arc::new(RecordingFinancialData::failing());
        let stage = FetchStage::new(data);

        let err = stage
            .run(state_with_fields("公司：2330.TW\n時間：2024Q1\n報表：季度損益表"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::DataProvider(_)));
    }
}
