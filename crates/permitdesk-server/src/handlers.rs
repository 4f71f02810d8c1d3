use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use permitdesk_core::{
    CompletionSummary, DueSoonEntry, FormRow, SortDirection, SortKey, build_rows,
    completion_by_frequency, select_due_soon, sort_rows,
};
use permitdesk_gateway::{AnswersPayload, ChatQnaReply, ExtractInfoReply, GatewayError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::AppState;
use crate::error::ApiError;

const NO_STORE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-store")];

pub const CHAT_QNA_SUCCESS: &str = "Business details fetched successfully";
const CHAT_QNA_FAILURE: &str = "Failed to fetch business data";
const DUE_SOON_FAILURE: &str = "Failed to fetch due forms";
const EXTRACT_FAILURE: &str = "Failed to extract business details";

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "message": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Catalog ──

pub async fn list_forms(State(state): State<AppState>) -> Result<Response, ApiError> {
    let map = serde_json::to_value(state.catalog.to_id_map())
        .map_err(|_| ApiError::Internal("Failed to load forms data"))?;
    info!(count = state.catalog.len(), "serving forms");
    Ok((NO_STORE, Json(map)).into_response())
}

pub async fn get_form(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let record = id
        .parse::<u32>()
        .ok()
        .and_then(|n| state.catalog.get_by_id(n))
        .ok_or(ApiError::NotFound(id))?;
    Ok(Json(record).into_response())
}

// ── Due soon ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSoonReply {
    pub due_forms: Vec<DueSoonEntry>,
}

pub async fn due_soon(State(state): State<AppState>) -> Result<Response, ApiError> {
    let analytics = state
        .analytics
        .as_ref()
        .ok_or(GatewayError::Config("analytics API key"))
        .map_err(ApiError::upstream(DUE_SOON_FAILURE))?;

    let window = state.config.due_soon_window_days;
    let limit = state.config.due_soon_limit;
    let predictions = analytics
        .due_predictions(window, limit)
        .await
        .map_err(ApiError::upstream(DUE_SOON_FAILURE))?;

    // Upstream filtering is advisory; window, priority and order are decided here.
    let mut due_forms = select_due_soon(&predictions, state.clock.today(), window);
    due_forms.truncate(limit);
    info!(count = due_forms.len(), "serving due-soon forms");
    Ok((NO_STORE, Json(DueSoonReply { due_forms })).into_response())
}

// ── Intake ──

fn answers_from(payload: Result<Json<AnswersPayload>, JsonRejection>) -> Result<String, ApiError> {
    let Json(AnswersPayload { answers }) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(answers)
}

pub async fn send_chat_qna(
    State(state): State<AppState>,
    payload: Result<Json<AnswersPayload>, JsonRejection>,
) -> Result<Json<ChatQnaReply>, ApiError> {
    let answers = answers_from(payload)?;
    info!(
        endpoint = %state.extraction.base_url(),
        bytes = answers.len(),
        "forwarding intake answers"
    );
    let extracted = state
        .extraction
        .extract_info(&answers)
        .await
        .map_err(ApiError::upstream(CHAT_QNA_FAILURE))?;
    debug!(
        fields = extracted.as_object().map_or(0, |m| m.len()),
        "extraction service replied"
    );

    Ok(Json(ChatQnaReply {
        message: CHAT_QNA_SUCCESS.to_string(),
        data: AnswersPayload { answers },
    }))
}

pub async fn extract_info(
    State(state): State<AppState>,
    payload: Result<Json<AnswersPayload>, JsonRejection>,
) -> Result<Json<ExtractInfoReply>, ApiError> {
    let answers = answers_from(payload)?;
    let llm = state
        .llm
        .as_ref()
        .ok_or(GatewayError::Config("LLM API key"))
        .map_err(ApiError::upstream(EXTRACT_FAILURE))?;
    let extracted_info = llm
        .extract_business_details(&answers)
        .await
        .map_err(ApiError::upstream(EXTRACT_FAILURE))?;
    Ok(Json(ExtractInfoReply { extracted_info }))
}

// ── Dashboard ──

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub sort: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReply {
    pub rows: Vec<FormRow>,
    pub completion: CompletionSummary,
    pub due_soon: Vec<DueSoonEntry>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Response, ApiError> {
    let direction = params
        .direction
        .as_deref()
        .map(str::parse::<SortDirection>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
        .unwrap_or_default();
    let key = params
        .sort
        .as_deref()
        .map(str::parse::<SortKey>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let today = state.clock.today();
    let records = state.catalog.list_all();
    let mut rows = build_rows(records, today);
    if let Some(key) = key {
        rows = sort_rows(&rows, key, direction);
    }
    let completion = completion_by_frequency(&rows);
    let mut due_soon = select_due_soon(records, today, state.config.due_soon_window_days);
    due_soon.truncate(state.config.due_soon_limit);

    Ok((NO_STORE, Json(DashboardReply { rows, completion, due_soon })).into_response())
}
