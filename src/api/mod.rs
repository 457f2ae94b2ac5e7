//! HTTP and WebSocket transport

pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;

pub use handlers::AppState;
pub use models::{ApiError, ClientFrame, ServerFrame};
pub use routes::build_router;
