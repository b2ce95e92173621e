//! HTTP-backed financial data client
//!
//! Calls the statements endpoint of the financial API service:
//! `GET {base}/api/v1/statements/{ticker}?statement=..&period=..&as_of=..`

use crate::config::AgentConfig;
use crate::error::PipelineError;
use crate::market_data::FinancialDataPort;
use crate::models::{FinancialSnapshot, LineItem, PeriodType, StatementKind};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct HttpFinancialDataClient {
    client: Client,
    base_url: Url,
}

impl HttpFinancialDataClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(base_url).map_err(|e| {
            PipelineError::Config(format!("FINANCIAL_API_BASE_URL={}: {}", base_url, e))
        })?;

        Ok(Self { client, base_url })
    }

    /// `None` when no financial API is configured.
    pub fn from_config(config: &AgentConfig) -> Result<Option<Self>> {
        config
            .financial_api_base_url
            .as_deref()
            .map(Self::new)
            .transpose()
    }

    /// The ticker is pushed as a single percent-encoded path segment.
    fn statement_url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PipelineError::Config(format!(
                    "FINANCIAL_API_BASE_URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v1", "statements"])
            .push(ticker);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    ticker: String,
    as_of: NaiveDate,
    #[serde(default)]
    rows: Vec<StatementRow>,
}

#[derive(Debug, Deserialize)]
struct StatementRow {
    item: String,
    value: Option<f64>,
}

impl From<StatementResponse> for FinancialSnapshot {
    fn from(response: StatementResponse) -> Self {
        FinancialSnapshot {
            ticker: response.ticker,
            as_of: response.as_of,
            rows: response
                .rows
                .into_iter()
                .map(|row| LineItem {
                    item: row.item,
                    value: row.value,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl FinancialDataPort for HttpFinancialDataClient {
    async fn fetch(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        kind: StatementKind,
        period_type: PeriodType,
    ) -> Result<Option<FinancialSnapshot>> {
        let url = self.statement_url(ticker)?;
        let as_of_param = as_of.to_string();

        debug!(
            ticker,
            as_of = %as_of_param,
            statement = kind.as_str(),
            period = period_type.as_str(),
            "Fetching statement"
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("statement", kind.as_str()),
                ("period", period_type.as_str()),
                ("as_of", as_of_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                PipelineError::DataProvider(format!(
                    "Financial API request failed for {}: {}",
                    ticker, e
                ))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::DataProvider(format!(
                "Financial API returned {} for {}: {}",
                status, ticker, body
            )));
        }

        let body = response.json::<StatementResponse>().await.map_err(|e| {
            PipelineError::DataProvider(format!("Invalid JSON response: {}", e))
        })?;

        Ok(Some(body.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_url() {
        let client = HttpFinancialDataClient::new("http://localhost:8000/").unwrap();
        assert_eq!(
            client.statement_url("2330.TW").unwrap().as_str(),
            "http://localhost:8000/api/v1/statements/2330.TW"
        );
    }

    #[test]
    fn test_statement_url_keeps_base_path() {
        let client = HttpFinancialDataClient::new("http://localhost:8000/data").unwrap();
        assert_eq!(
            client.statement_url("AAPL").unwrap().as_str(),
            "http://localhost:8000/data/api/v1/statements/AAPL"
        );
    }

    #[test]
    fn test_statement_url_encodes_ticker() {
        let client = HttpFinancialDataClient::new("http://localhost:8000").unwrap();
        let url = client.statement_url("BRK/B?x=1#top").unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/statements/BRK%2FB%3Fx=1%23top"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpFinancialDataClient::new("not a url").err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_response_into_snapshot() {
        let response: StatementResponse = serde_json::from_str(
            r#"{
                "ticker": "2330.TW",
                "as_of": "2024-03-31",
                "rows": [
                    {"item": "Total Revenue", "value": 592644201000.0},
                    {"item": "Tax Effect Of Unusual Items", "value": null}
                ]
            }"#,
        )
        .unwrap();

        let snapshot: FinancialSnapshot = response.into();
        assert_eq!(snapshot.ticker, "2330.TW");
        assert_eq!(snapshot.as_of, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[1].value, None);
    }

    #[test]
    fn test_from_config_without_url() {
        let config = AgentConfig::default();
        assert!(HttpFinancialDataClient::from_config(&config)
            .unwrap()
            .is_none());
    }
}
