//! WebSocket autocomplete channel
//!
//! Each `autocomplete` frame runs on its own task through the debounced
//! path, so a later keystroke can supersede an earlier one while it waits.
//! Replies go through a bounded per-connection queue drained by a writer task.

use super::handlers::AppState;
use super::models::{ClientFrame, ServerFrame};
use crate::error::ContextError;
use crate::service::ChatService;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outgoing frames buffered per connection
pub const SEND_QUEUE_CAPACITY: usize = 256;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.service))
}

async fn handle_socket(socket: WebSocket, service: Arc<ChatService>) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(SEND_QUEUE_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handle_frame(&service, &tx, connection_id, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(connection_id = %connection_id, "WebSocket read error: {}", e);
                break;
            }
        }
    }

    // in-flight requests may still hold senders; their replies have nowhere to go
    writer.abort();
    info!(connection_id = %connection_id, "WebSocket client disconnected");
}

fn handle_frame(
    service: &Arc<ChatService>,
    tx: &mpsc::Sender<String>,
    connection_id: Uuid,
    text: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(connection_id = %connection_id, "Malformed WebSocket frame: {}", e);
            send_frame(tx, connection_id, &ServerFrame::error(format!("invalid message: {}", e)));
            return;
        }
    };

    if frame.kind != "autocomplete" {
        send_frame(tx, connection_id, &ServerFrame::error("unknown message type"));
        return;
    }

    let Some(request) = frame.autocomplete_request else {
        send_frame(
            tx,
            connection_id,
            &ServerFrame::error("autocomplete_request is required"),
        );
        return;
    };

    let service = service.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let reply = match service.get_suggestions_debounced(request).await {
            Ok(data) => ServerFrame::AutocompleteResponse { data },
            Err(ContextError::Superseded) => return,
            Err(e) => ServerFrame::error(e.to_string()),
        };
        send_frame(&tx, connection_id, &reply);
    });
}

fn send_frame(tx: &mpsc::Sender<String>, connection_id: Uuid, frame: &ServerFrame) {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!(connection_id = %connection_id, "Failed to encode frame: {}", e);
            return;
        }
    };

    match tx.try_send(json) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(connection_id = %connection_id, "Send queue full, dropping frame");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(connection_id = %connection_id, "Connection closed, dropping frame");
        }
    }
}
