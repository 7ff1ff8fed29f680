//! WebSocket endpoint for live subscription change notifications.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    adapters::websocket::hub::{ConnectionId, NotificationHub},
    app_error::AppResult,
    application::jwt,
};

#[derive(Deserialize)]
struct WsQuery {
    token: String,
}

/// GET /api/ws?token=<jwt>
///
/// Browsers cannot set headers on WebSocket handshakes, so the token rides
/// in the query string. Authentication happens before the upgrade; a bad
/// token never gets a socket.
async fn ws_handler(
    State(app_state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let user_id = jwt::verify_user_id(&query.token, &app_state.config.jwt_secret)?;
    let hub = app_state.hub.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, hub)))
}

async fn handle_socket(mut socket: WebSocket, user_id: Uuid, hub: Arc<NotificationHub>) {
    let connection_id = ConnectionId::new();
    let mut rx = hub.join(user_id, connection_id).await;

    tracing::debug!(%user_id, %connection_id, "WebSocket connected");

    loop {
        tokio::select! {
            change = rx.recv() => match change {
                Ok(change) => {
                    let Ok(text) = serde_json::to_string(&change) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // This connection fell behind; skip what was dropped and
                // keep going. Clients re-fetch state anyway.
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                // Inbound messages are ignored; the channel is push-only.
                Some(Ok(_)) => {}
            },
        }
    }

    drop(rx);
    hub.leave(&connection_id).await;
    tracing::debug!(%user_id, %connection_id, "WebSocket disconnected");
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
