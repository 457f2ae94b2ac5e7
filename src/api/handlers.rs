//! HTTP handlers

use super::models::{ApiError, HealthResponse, HistoryQuery};
use crate::autocomplete::{AutocompleteRequest, AutocompleteResponse};
use crate::error::ContextError;
use crate::metrics::METRICS;
use crate::service::{ChatService, HistoryResponse, SaveMessageRequest, SaveMessageResponse};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// HTTP status for a pipeline error
pub fn status_for(err: &ContextError) -> StatusCode {
    match err {
        ContextError::NotFound(_) => StatusCode::NOT_FOUND,
        ContextError::Validation(_) => StatusCode::BAD_REQUEST,
        ContextError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ContextError::Provider(_) => StatusCode::BAD_GATEWAY,
        ContextError::Superseded => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: ContextError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (status, Json(ApiError::new(err.code(), err.to_string())))
}

/// Non-debounced suggestions
///
/// POST /api/chat/complete
pub async fn complete(
    State(state): State<AppState>,
    Json(request): Json<AutocompleteRequest>,
) -> ApiResult<AutocompleteResponse> {
    debug!(
        conversation_id = %request.conversation_id,
        sender_id = %request.sender_id,
        "Completion request"
    );

    state
        .service
        .get_suggestions(&request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/chat/message
pub async fn save_message(
    State(state): State<AppState>,
    Json(request): Json<SaveMessageRequest>,
) -> ApiResult<SaveMessageResponse> {
    state
        .service
        .save_message(request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /api/chat/history/:conversation_id?limit=N
pub async fn history(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<HistoryResponse> {
    state
        .service
        .get_history(&conversation_id, query.parsed_limit())
        .await
        .map(Json)
        .map_err(error_response)
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}
