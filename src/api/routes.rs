//! Router assembly

use super::{handlers, websocket, AppState};
use crate::config::ServerConfig;
use crate::service::ChatService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the HTTP + WebSocket router
pub fn build_router(service: Arc<ChatService>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/chat/complete", post(handlers::complete))
        .route("/api/chat/message", post(handlers::save_message))
        .route(
            "/api/chat/history/:conversation_id",
            get(handlers::history),
        )
        .route("/ws", get(websocket::ws_handler))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(AppState { service })
}
