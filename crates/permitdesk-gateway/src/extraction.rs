//! Delivery of intake transcripts.
//!
//! [`ExtractionClient`] talks to the extraction endpoint directly;
//! [`ChatQnaClient`] goes through the dashboard server's `/api/send-chat-qna`
//! route. Both can terminate an intake [`Wizard`](permitdesk_core::Wizard).

use std::time::Duration;

use permitdesk_core::{AnswerSink, BusinessDetails};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GatewayError;
use crate::http::{DEFAULT_UPSTREAM_TIMEOUT, bounded, post_json};

pub const DEFAULT_EXTRACTION_URL: &str = "http://127.0.0.1:3000/api";

/// Body of both the chat submission and the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswersPayload {
    pub answers: String,
}

/// Reply of `/api/send-chat-qna`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQnaReply {
    pub message: String,
    pub data: AnswersPayload,
}

/// Reply of `/api/extract-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractInfoReply {
    pub extracted_info: BusinessDetails,
}

#[derive(Debug, Clone)]
pub struct ExtractionClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ExtractionClient {
    /// `base_url` is the prefix in front of `/extract-info`, e.g.
    /// `http://127.0.0.1:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Give up on a call after `timeout` instead of the default 50 s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward the concatenated answers. The reply shape belongs to the
    /// extraction service, so it is returned untyped.
    pub async fn extract_info(&self, answers: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/extract-info", self.base_url);
        let body = AnswersPayload {
            answers: answers.to_string(),
        };
        bounded(self.timeout, post_json(&self.client, &url, None, &body)).await
    }
}

impl AnswerSink for ExtractionClient {
    type Output = Value;
    type Error = GatewayError;

    async fn deliver(&self, transcript: &str) -> Result<Value, GatewayError> {
        self.extract_info(transcript).await
    }
}

/// Client for the dashboard server's chat submission route.
#[derive(Debug, Clone)]
pub struct ChatQnaClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ChatQnaClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Give up on a call after `timeout` instead of the default 50 s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn send_chat_qna(&self, answers: &str) -> Result<ChatQnaReply, GatewayError> {
        let url = format!("{}/api/send-chat-qna", self.base_url);
        let body = AnswersPayload {
            answers: answers.to_string(),
        };
        bounded(self.timeout, post_json(&self.client, &url, None, &body)).await
    }
}

impl AnswerSink for ChatQnaClient {
    type Output = ChatQnaReply;
    type Error = GatewayError;

    async fn deliver(&self, transcript: &str) -> Result<ChatQnaReply, GatewayError> {
        self.send_chat_qna(transcript).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use permitdesk_core::{Prompt, Wizard, WizardError, WizardPhase};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ExtractionClient::new("http://127.0.0.1:8000/api/py/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8000/api/py");
    }

    #[tokio::test]
    async fn wizard_submits_joined_answers_to_extract_info() {
        let received = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = received.clone();
        let app = Router::new().route(
            "/api/extract-info",
            post(move |axum::Json(body): axum::Json<AnswersPayload>| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(body.answers);
                    axum::Json(json!({"extracted_info": {"city": "San Francisco"}}))
                }
            }),
        );
        let base = spawn(app).await;
        let sink = ExtractionClient::new(format!("{base}/api"));

        let mut wizard = Wizard::new(vec![Prompt::text("A"), Prompt::text("B")]).unwrap();
        wizard.start();
        wizard.record_answer("x").unwrap();
        wizard.record_answer("y").unwrap();
        let reply = wizard.submit(&sink).await.unwrap();

        assert_eq!(reply["extracted_info"]["city"], "San Francisco");
        assert_eq!(received.lock().unwrap().as_slice(), ["x\n\ny"]);
        assert_eq!(wizard.phase(), WizardPhase::Submitted);
    }

    #[tokio::test]
    async fn stalled_extraction_times_out() {
        let app = Router::new().route(
            "/api/extract-info",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                axum::Json(json!({}))
            }),
        );
        let base = spawn(app).await;
        let client = ExtractionClient::new(format!("{base}/api")).with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = client.extract_info("x").await.unwrap_err();

        assert!(matches!(err, GatewayError::Timeout(d) if d == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn failed_delivery_keeps_wizard_answers() {
        let app = Router::new().route(
            "/api/send-chat-qna",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({"error": "Failed to fetch business data"})),
                )
            }),
        );
        let base = spawn(app).await;
        let sink = ChatQnaClient::new(base);

        let mut wizard = Wizard::new(vec![Prompt::text("Only")]).unwrap();
        wizard.start();
        wizard.record_answer("answer").unwrap();
        let err = wizard.submit(&sink).await.unwrap_err();

        assert!(matches!(err, WizardError::Delivery(ref m) if m.contains("Failed to fetch business data")));
        assert!(wizard.is_terminal());
        assert_eq!(wizard.answers().len(), 1);
    }
}
