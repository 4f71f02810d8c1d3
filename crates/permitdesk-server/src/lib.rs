//! HTTP API for the permitdesk dashboard.
//!
//! Holds every credential and prompt template; browsers and the CLI only see
//! the JSON routes built by [`build_router`].

mod config;
mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use permitdesk_core::Catalog;
use permitdesk_gateway::{AnalyticsClient, ExtractionClient, LlmClient};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::{Clock, ServerConfig};
pub use error::ApiError;

/// Shared, cheaply clonable handler state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub analytics: Option<AnalyticsClient>,
    pub extraction: ExtractionClient,
    pub llm: Option<LlmClient>,
    pub clock: Clock,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the outbound clients from `config`. Missing keys leave the
    /// matching client unset; its routes then answer with a configuration
    /// error instead of calling out.
    pub fn new(catalog: Catalog, config: ServerConfig) -> Self {
        let analytics = AnalyticsClient::from_key(&config.analytics_url, config.analytics_key.clone())
            .map(|c| c.with_retry(config.analytics_retry))
            .inspect_err(|e| warn!(error = %e, "due-soon route disabled"))
            .ok();
        let llm = LlmClient::from_key(&config.llm_url, config.llm_key.clone(), &config.llm_model)
            .map(|c| c.with_timeout(config.upstream_timeout))
            .inspect_err(|e| warn!(error = %e, "extract-info route disabled"))
            .ok();
        Self {
            catalog: Arc::new(catalog),
            analytics,
            extraction: ExtractionClient::new(&config.extraction_url).with_timeout(config.upstream_timeout),
            llm,
            clock: Clock::System,
            config: Arc::new(config),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/forms", get(handlers::list_forms))
        .route("/api/forms/due-soon", get(handlers::due_soon))
        .route("/api/forms/:id", get(handlers::get_form))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/send-chat-qna", post(handlers::send_chat_qna))
        .route("/api/extract-info", post(handlers::extract_info))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, forms = state.catalog.len(), "permitdesk server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
}
