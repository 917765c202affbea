//! Top search term lookup against the Google Trends public dataset.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::WarehouseConfig;
use crate::error::TrendError;
use crate::models::{SearchTerm, TrendResult};

const BIGQUERY_API: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// The dataset lands with a delay, so the newest days are never queryable.
const LANDING_DELAY_DAYS: i64 = 2;
const LOOKBACK_DAYS: i64 = 26;

/// Dates a user may ask about, relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendDateRange {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl TrendDateRange {
    pub fn for_today(today: NaiveDate) -> Self {
        TrendDateRange {
            min: today - Duration::days(LOOKBACK_DAYS),
            max: today - Duration::days(LANDING_DELAY_DAYS),
        }
    }

    pub fn default_date(&self) -> NaiveDate {
        self.max
    }

    pub fn validate(&self, date: NaiveDate) -> Result<NaiveDate, TrendError> {
        if date < self.min || date > self.max {
            return Err(TrendError::DateOutOfRange {
                date,
                min: self.min,
                max: self.max,
            });
        }
        Ok(date)
    }
}

#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Rank-1 terms for the latest reporting week at or before `date`.
    /// Ties come back together, in warehouse order.
    async fn top_terms(&self, date: NaiveDate) -> Result<Vec<SearchTerm>, TrendError>;
}

pub async fn lookup<T: TrendSource + ?Sized>(
    source: &T,
    range: &TrendDateRange,
    date: NaiveDate,
) -> Result<TrendResult, TrendError> {
    let date = range.validate(date)?;
    let terms = source.top_terms(date).await?;
    if terms.is_empty() {
        return Err(TrendError::NoData(date));
    }
    info!("Top search terms for {}: {:?}", date, terms);
    Ok(TrendResult { date, terms })
}

pub struct BigQueryTrends {
    client: Client,
    project_id: String,
    table: String,
    access_token: String,
}

impl BigQueryTrends {
    pub fn new(client: Client, warehouse: &WarehouseConfig) -> Result<Self, TrendError> {
        let access_token = warehouse.resolve_access_token().ok_or_else(|| {
            TrendError::NotConfigured(format!(
                "no warehouse.access_token and ${} is not set",
                crate::config::ACCESS_TOKEN_ENV
            ))
        })?;

        Ok(BigQueryTrends {
            client,
            project_id: warehouse.project_id.clone(),
            table: warehouse.table.clone(),
            access_token,
        })
    }
}

#[async_trait]
impl TrendSource for BigQueryTrends {
    async fn top_terms(&self, date: NaiveDate) -> Result<Vec<SearchTerm>, TrendError> {
        let url = format!("{}/projects/{}/queries", BIGQUERY_API, self.project_id);
        let body = json!({
            "query": top_term_sql(&self.table),
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "trend_date",
                "parameterType": { "type": "DATE" },
                "parameterValue": { "value": date.format("%Y-%m-%d").to_string() }
            }]
        });

        debug!("Querying {} for top terms on {}", self.table, date);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TrendError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TrendError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(TrendError::ApiError {
                status: status.as_u16(),
                message: text.trim().to_string(),
            });
        }

        parse_query_response(&text)
    }
}

/// Rank-1 terms of the newest refresh for the latest week at or before `@trend_date`.
pub fn top_term_sql(table: &str) -> String {
    format!(
        r#"
        WITH latest AS (
          SELECT * FROM `{table}`
          WHERE refresh_date = (SELECT MAX(refresh_date) FROM `{table}`)
        )
        SELECT DISTINCT term
        FROM latest
        WHERE rank = 1
          AND week = (SELECT MAX(week) FROM latest WHERE week <= @trend_date)
        "#
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Option<String>,
}

fn parse_query_response(text: &str) -> Result<Vec<SearchTerm>, TrendError> {
    let response: QueryResponse =
        serde_json::from_str(text).map_err(|e| TrendError::ParseError(e.to_string()))?;

    if !response.job_complete {
        return Err(TrendError::Incomplete);
    }

    let mut terms: Vec<SearchTerm> = Vec::with_capacity(response.rows.len());
    for row in response.rows {
        let term = row
            .f
            .into_iter()
            .next()
            .and_then(|cell| cell.v)
            .ok_or_else(|| TrendError::ParseError("row without a term".to_string()))?;
        let term = SearchTerm(term);
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_excludes_landing_delay() {
        let range = TrendDateRange::for_today(date(2024, 5, 30));
        assert_eq!(range.max, date(2024, 5, 28));
        assert_eq!(range.min, date(2024, 5, 4));
        assert_eq!(range.default_date(), date(2024, 5, 28));

        assert!(range.validate(date(2024, 5, 28)).is_ok());
        assert!(range.validate(date(2024, 5, 4)).is_ok());
        assert!(matches!(
            range.validate(date(2024, 5, 29)),
            Err(TrendError::DateOutOfRange { .. })
        ));
        assert!(range.validate(date(2024, 5, 3)).is_err());
    }

    #[test]
    fn parses_rows_and_keeps_ties() {
        let text = r#"{
          "kind": "bigquery#queryResponse",
          "jobComplete": true,
          "totalRows": "3",
          "rows": [
            {"f": [{"v": "world cup"}]},
            {"f": [{"v": "eclipse"}]},
            {"f": [{"v": "world cup"}]}
          ]
        }"#;
        let terms = parse_query_response(text).unwrap();
        assert_eq!(
            terms,
            vec![SearchTerm("world cup".into()), SearchTerm("eclipse".into())]
        );
    }

    #[test]
    fn incomplete_job_is_an_error() {
        let err = parse_query_response(r#"{"jobComplete": false}"#).unwrap_err();
        assert!(matches!(err, TrendError::Incomplete));
    }

    #[test]
    fn sql_targets_configured_table() {
        let sql = top_term_sql("my-project.trends.top_terms");
        assert!(sql.contains("`my-project.trends.top_terms`"));
        assert!(sql.contains("rank = 1"));
        assert!(sql.contains("@trend_date"));
    }

    struct FixedTrends {
        terms: Vec<SearchTerm>,
        asked: Mutex<Vec<NaiveDate>>,
    }

    #[async_trait]
    impl TrendSource for FixedTrends {
        async fn top_terms(&self, date: NaiveDate) -> Result<Vec<SearchTerm>, TrendError> {
            self.asked.lock().unwrap().push(date);
            Ok(self.terms.clone())
        }
    }

    #[tokio::test]
    async fn lookup_validates_before_querying() {
        let source = FixedTrends {
            terms: vec![SearchTerm("eclipse".into())],
            asked: Mutex::new(Vec::new()),
        };
        let range = TrendDateRange::for_today(date(2024, 5, 30));

        let result = lookup(&source, &range, date(2024, 5, 20)).await.unwrap();
        assert_eq!(result.date, date(2024, 5, 20));
        assert!(!result.terms.is_empty());
        assert_eq!(
            result.display_line(),
            "Top search term for date 2024-05-20 is: eclipse"
        );

        assert!(lookup(&source, &range, date(2024, 5, 30)).await.is_err());
        assert_eq!(source.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_week_is_reported_as_no_data() {
        let source = FixedTrends {
            terms: Vec::new(),
            asked: Mutex::new(Vec::new()),
        };
        let range = TrendDateRange::for_today(date(2024, 5, 30));

        let err = lookup(&source, &range, date(2024, 5, 20)).await.unwrap_err();
        assert!(matches!(err, TrendError::NoData(d) if d == date(2024, 5, 20)));
        assert_eq!(err.to_string(), "No search trend data for 2024-05-20");
    }

    #[test]
    fn response_without_rows_is_empty() {
        let text = r#"{"jobComplete": true, "totalRows": "0"}"#;
        assert!(parse_query_response(text).unwrap().is_empty());
    }
}
