use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// A credential or endpoint needed for the call is missing.
    #[error("{0} is not configured")]
    Config(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("analytics query failed: {0}")]
    Query(String),
}

impl GatewayError {
    /// Configuration problems fail fast; everything else may succeed on a
    /// later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::Config(_))
    }
}
