//! `WebSocket` handler for the delta stream.
//!
//! Clients connect to `GET /ws` and receive every delta frame as a binary
//! gzip message. Text or binary messages from the client are treated as
//! heartbeats and ignored; pings are answered. A client dropped by the
//! registry for falling behind sees its connection closed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::debug;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming delta frames.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_deltas(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Register the socket and forward queued frames until either side stops.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut rx) = state.registry.register().await;
    debug!(connection = %id, "WebSocket client connected");

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!(connection = %id, "connection dropped by registry");
                    break;
                };
                if socket.send(Message::Binary(frame)).await.is_err() {
                    debug!(connection = %id, "WebSocket client disconnected (send failed)");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(connection = %id, "WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(connection = %id, error = %e, "WebSocket error");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Heartbeat.
                    }
                }
            }
        }
    }

    state.registry.unregister(id).await;
}
