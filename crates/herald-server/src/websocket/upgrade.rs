//! `GET /ws` upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use herald_core::UserId;
use herald_hub::{Hub, HubError};
use tracing::{debug, warn};

use super::identity::{WsQuery, identify};
use super::transport;
use crate::server::AppState;

/// Upgrade an authenticated request and hand the socket to the hub.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(user_id) = identify(&headers, &state.user_header, &query) else {
        warn!("websocket upgrade rejected: no user identity");
        return (StatusCode::UNAUTHORIZED, "missing user identity").into_response();
    };
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }

    debug!(user_id = %user_id, "upgrading websocket");
    let hub = Arc::clone(&state.hub);
    let shutdown = Arc::clone(&state.shutdown);
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| shutdown.track(run_socket(hub, user_id, socket)))
}

async fn run_socket(hub: Arc<Hub>, user_id: UserId, socket: WebSocket) {
    let (sink, source) = transport::split(socket);
    match hub.on_connection_established(user_id, sink, source) {
        Ok(session) => {
            let _ = session.join().await;
        }
        // Upgraded after the drain started; dropping the socket closes it.
        Err(HubError::ShuttingDown) => debug!("connection refused during shutdown"),
        Err(err) => warn!(error = %err, "connection not admitted"),
    }
}
