//! Client for the SQL-over-HTTP analytics service that predicts form due dates.

use chrono::NaiveDate;
use permitdesk_core::DueDated;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::GatewayError;
use crate::http::{RetryPolicy, fetch_with_retry, read_json};

pub const DEFAULT_ANALYTICS_URL: &str = "https://cloud.mindsdb.com/api/sql/query";
pub const DEFAULT_PREDICTION_MODEL: &str = "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo";

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Result set of one SQL statement.
///
/// The service answers either with `column_names` + positional `data` rows or
/// with a list of keyed `rows`; [`records`](Self::records) normalises both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl QueryResult {
    pub fn records(&self) -> Vec<Map<String, Value>> {
        if !self.rows.is_empty() {
            return self.rows.clone();
        }
        self.data
            .iter()
            .map(|row| {
                self.column_names
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// A predicted due date for one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuePrediction {
    pub form_name: String,
    pub due_date: NaiveDate,
    pub document_url: String,
}

impl DuePrediction {
    /// Build from a result row; `None` when a field is missing or the date
    /// does not parse.
    fn from_record(record: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| record.get(key).and_then(Value::as_str);
        Some(Self {
            form_name: text("form_name")?.to_string(),
            due_date: parse_date(text("due_date")?)?,
            document_url: text("document_url").unwrap_or_default().to_string(),
        })
    }
}

impl DueDated for DuePrediction {
    fn display_name(&self) -> &str {
        &self.form_name
    }

    fn due_date(&self) -> Option<NaiveDate> {
        Some(self.due_date)
    }

    fn document_url(&self) -> &str {
        &self.document_url
    }
}

/// Accepts `2026-11-01`, `2026-11-01 00:00:00` and RFC 3339 timestamps.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Escape a string for use in SQL single-quoted literals.
fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

fn due_dates_query(window_days: i64, limit: usize) -> String {
    format!(
        "SELECT f.name AS form_name, p.due_date, f.resourceUrl AS document_url \
         FROM files_database.pdf_files AS f \
         JOIN forms_project.forms_due_dates AS p \
         WHERE p.due_date BETWEEN NOW() AND DATE_ADD(NOW(), INTERVAL {window_days} DAY) \
         ORDER BY p.due_date ASC \
         LIMIT {limit};"
    )
}

/// Statements that set up the project, the document table and the due-date
/// model, in execution order.
fn provisioning_statements(llm_api_key: &str, model_name: &str) -> Vec<String> {
    vec![
        "CREATE PROJECT IF NOT EXISTS forms_project;".to_string(),
        "CREATE DATABASE IF NOT EXISTS forms_project.files_database;".to_string(),
        "CREATE TABLE IF NOT EXISTS forms_project.files_database.pdf_files (\
         id INT AUTO_INCREMENT PRIMARY KEY, \
         filename VARCHAR(255), \
         text_content TEXT, \
         file_path VARCHAR(512), \
         created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP);"
            .to_string(),
        format!(
            "CREATE MODEL IF NOT EXISTS forms_project.forms_due_dates \
             PREDICT due_date \
             USING ENGINE = 'together', \
             MODEL_NAME = '{}', \
             API_KEY = '{}';",
            sql_escape(model_name),
            sql_escape(llm_api_key),
        ),
        "RETRAIN forms_project.forms_due_dates \
         FROM forms_project.files_database.pdf_files \
         USING text_content;"
            .to_string(),
    ]
}

/// Bearer-authenticated client for the analytics SQL endpoint.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl AnalyticsClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client only when a non-blank key is present.
    pub fn from_key(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, GatewayError> {
        match api_key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(endpoint, key)),
            _ => Err(GatewayError::Config("analytics API key")),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one SQL statement.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, GatewayError> {
        info!(endpoint = %self.endpoint, "running analytics query");
        let body = QueryRequest { query: sql };
        let resp = fetch_with_retry(&self.retry, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        let result: QueryResult = read_json(resp).await?;
        if result.kind.as_deref() == Some("error") {
            return Err(GatewayError::Query(
                result.error_message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(result)
    }

    /// Predicted due dates within the next `window_days` days, nearest first.
    ///
    /// Rows without a name or with an unparseable date are skipped.
    pub async fn due_predictions(
        &self,
        window_days: i64,
        limit: usize,
    ) -> Result<Vec<DuePrediction>, GatewayError> {
        let result = self.query(&due_dates_query(window_days, limit)).await?;
        let records = result.records();
        let predictions: Vec<DuePrediction> = records
            .iter()
            .filter_map(|record| {
                let prediction = DuePrediction::from_record(record);
                if prediction.is_none() {
                    warn!(?record, "skipping malformed due-date row");
                }
                prediction
            })
            .collect();
        info!(count = predictions.len(), "fetched due-date predictions");
        Ok(predictions)
    }

    /// Create the prediction project and model, then start training.
    ///
    /// Statements run in order and each is retried on its own; the first one
    /// that still fails aborts the rest.
    pub async fn provision_due_date_model(
        &self,
        llm_api_key: &str,
        model_name: &str,
    ) -> Result<usize, GatewayError> {
        let statements = provisioning_statements(llm_api_key, model_name);
        for (i, sql) in statements.iter().enumerate() {
            info!(step = i + 1, total = statements.len(), "provisioning analytics model");
            self.query(sql).await?;
        }
        Ok(statements.len())
    }
}
