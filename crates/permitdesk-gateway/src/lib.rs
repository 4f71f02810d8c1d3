//! Outbound gateways: thin wrappers around the external services permitdesk
//! depends on.

pub mod analytics;
mod error;
pub mod extraction;
pub mod http;
pub mod llm;

pub use analytics::{AnalyticsClient, DuePrediction, QueryResult};
pub use error::GatewayError;
pub use extraction::{AnswersPayload, ChatQnaClient, ChatQnaReply, ExtractInfoReply, ExtractionClient};
pub use http::{DEFAULT_UPSTREAM_TIMEOUT, RetryPolicy, bounded, fetch_with_retry, post_json, retry_with_backoff};
pub use llm::{ChatMessage, LlmClient};
