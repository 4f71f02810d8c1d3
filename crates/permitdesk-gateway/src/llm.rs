//! Hosted LLM inference over an OpenAI-compatible chat completions API.

use std::time::Duration;

use permitdesk_core::BusinessDetails;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::GatewayError;
use crate::http::{DEFAULT_UPSTREAM_TIMEOUT, bounded, post_json};

pub const DEFAULT_LLM_URL: &str = "https://api.together.xyz/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo";

// ── Prompt templates ──

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are a helpful assistant trying to take context out of a statement. \
Only extract what they say, don't debate it. Only answer in JSON.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a client only when a non-blank key is present.
    pub fn from_key(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        match api_key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(endpoint, key, model)),
            _ => Err(GatewayError::Config("LLM API key")),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat completion; returns the first choice's content.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        response_format: Option<Value>,
    ) -> Result<String, GatewayError> {
        info!(model = %self.model, messages = messages.len(), "requesting chat completion");
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format,
        };
        let resp: ChatResponse = bounded(
            self.timeout,
            post_json(&self.client, &self.endpoint, Some(&self.api_key), &request),
        )
        .await?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::Decode("completion has no choices".into()))
    }

    /// Pull [`BusinessDetails`] out of a free-text intake transcript.
    pub async fn extract_business_details(&self, transcript: &str) -> Result<BusinessDetails, GatewayError> {
        let messages = [
            ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
            ChatMessage::user(transcript),
        ];
        let format = json!({
            "type": "json_object",
            "schema": BusinessDetails::json_schema()
        });
        let content = self.chat(&messages, Some(format)).await?;
        Ok(serde_json::from_str(strip_code_fence(&content))?)
    }
}
