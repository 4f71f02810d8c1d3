use std::time::Duration;

use chrono::{NaiveDate, Utc};
use permitdesk_core::{DUE_SOON_LIMIT, DUE_SOON_WINDOW_DAYS};
use permitdesk_gateway::{DEFAULT_UPSTREAM_TIMEOUT, RetryPolicy};
use permitdesk_gateway::analytics::DEFAULT_ANALYTICS_URL;
use permitdesk_gateway::extraction::DEFAULT_EXTRACTION_URL;
use permitdesk_gateway::llm::{DEFAULT_LLM_MODEL, DEFAULT_LLM_URL};

/// Everything the server needs from its environment.
///
/// Credentials are optional here: a missing key only fails the routes that
/// need it, with a configuration error.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub analytics_url: String,
    pub analytics_key: Option<String>,
    pub analytics_retry: RetryPolicy,
    pub extraction_url: String,
    pub llm_url: String,
    pub llm_key: Option<String>,
    pub llm_model: String,
    /// Limit on each extraction and LLM call.
    pub upstream_timeout: Duration,
    pub due_soon_window_days: i64,
    pub due_soon_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            analytics_url: DEFAULT_ANALYTICS_URL.to_string(),
            analytics_key: None,
            analytics_retry: RetryPolicy::default(),
            extraction_url: DEFAULT_EXTRACTION_URL.to_string(),
            llm_url: DEFAULT_LLM_URL.to_string(),
            llm_key: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            due_soon_window_days: DUE_SOON_WINDOW_DAYS,
            due_soon_limit: DUE_SOON_LIMIT,
        }
    }
}

/// Source of "today" for derived views.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Utc::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}
