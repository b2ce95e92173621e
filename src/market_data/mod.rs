//! Financial data port and implementations
//!
//! Looks up one statement for one ticker at one as-of date.
//! "Not found" is a normal answer (`Ok(None)`), not an error.

use crate::models::{FinancialSnapshot, PeriodType, StatementKind};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

pub mod http;
pub use http::HttpFinancialDataClient;

/// Trait for statement lookups
#[async_trait]
pub trait FinancialDataPort: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<Option<FinancialSnapshot>>;
}

type SnapshotKey = (String, NaiveDate, StatementKind, PeriodType);

/// Fixed table of snapshots for development runs without a data API
#[derive(Default)]
pub struct InMemoryFinancialData {
    snapshots: HashMap<SnapshotKey, FinancialSnapshot>,
}

impl InMemoryFinancialData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        kind: StatementKind,
        period_type: PeriodType,
        snapshot: FinancialSnapshot,
    ) {
        let key = (snapshot.ticker.clone(), snapshot.as_of, kind, period_type);
        self.snapshots.insert(key, snapshot);
    }

    pub fn with_snapshot(
        mut self,
        kind: StatementKind,
        period_type: PeriodType,
        snapshot: FinancialSnapshot,
    ) -> Self {
        self.insert(kind, period_type, snapshot);
        self
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl FinancialDataPort for InMemoryFinancialData {
    async fn fetch(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<Option<FinancialSnapshot>> {
        let key = (ticker.to_string(), as_of, kind, period_type);
        Ok(self.snapshots.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let data = InMemoryFinancialData::new().with_snapshot(
            StatementKind::Income,
            PeriodType::Quarterly,
            FinancialSnapshot {
                ticker: "2330.TW".to_string(),
                as_of,
                rows: vec![LineItem {
                    item: "Net Income".to_string(),
                    value: Some(225485400000.0),
                }],
            },
        );
        assert_eq!(data.len(), 1);

        let hit = data
            .fetch("2330.TW", as_of, StatementKind::Income, PeriodType::Quarterly)
            .await
            .unwrap();
        assert!(hit.is_some());

        let wrong_period = data
            .fetch("2330.TW", as_of, StatementKind::Income, PeriodType::Annual)
            .await
            .unwrap();
        assert!(wrong_period.is_none());

        let wrong_kind = data
            .fetch("2330.TW", as_of, StatementKind::Cashflow, PeriodType::Quarterly)
            .await
            .unwrap();
        assert!(wrong_kind.is_none());
    }
}
