use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use permitdesk_gateway::GatewayError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("form {0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    /// A call to an external service failed. `context` is what the client
    /// sees unless the cause is a missing credential.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn upstream(context: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| ApiError::Upstream { context, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client.
    fn public_message(&self) -> String {
        match self {
            ApiError::Upstream {
                source: source @ GatewayError::Config(_),
                ..
            } => source.to_string(),
            ApiError::Upstream { context, .. } => (*context).to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
