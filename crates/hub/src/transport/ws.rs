// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push-channel handler: upgrades `/api/v1/ws` and delivers broadcast
//! events to the connected device until the peer goes away.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::HubState;
use crate::transport::auth;

/// Query parameters for the push-channel upgrade. Custom headers are not
/// portable across WebSocket clients, so both travel in the query string.
#[derive(Debug, Clone, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
    pub device_id: Option<String>,
}

/// `GET /api/v1/ws` — WebSocket upgrade for push delivery.
pub async fn ws_handler(
    State(state): State<Arc<HubState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = query.token.as_deref().unwrap_or("");
    if auth::validate_token(token, &state.config.secret).is_err() {
        return axum::http::Response::builder()
            .status(401)
            .body(axum::body::Body::from("unauthorized"))
            .unwrap_or_default()
            .into_response();
    }

    let device_id = match query.device_id {
        Some(ref id) if !id.is_empty() => id.clone(),
        _ => {
            return axum::http::Response::builder()
                .status(400)
                .body(axum::body::Body::from("device_id query parameter is required"))
                .unwrap_or_default()
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_push_channel(state, device_id, socket)).into_response()
}

/// Per-connection task: forwards queued broadcasts to the peer and watches
/// the read side for disconnection.
async fn handle_push_channel(state: Arc<HubState>, device_id: String, socket: WebSocket) {
    let (tx, mut outbound) = mpsc::unbounded_channel::<Arc<str>>();
    let cancel = state.shutdown.child_token();
    let conn_id = state.broadcaster.add(&device_id, tx, cancel.clone());
    tracing::info!(device = %device_id, "push channel open");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Cancelled on shutdown or when a reconnect replaces this channel.
            _ = cancel.cancelled() => break,

            queued = outbound.recv() => {
                match queued {
                    Some(payload) => {
                        if ws_tx.send(Message::Text(payload.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // The read side exists only to detect disconnection.
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(device = %device_id, err = %e, "push channel read error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    if state.broadcaster.remove(&device_id, conn_id) {
        tracing::info!(device = %device_id, "push channel closed");
    }
}
