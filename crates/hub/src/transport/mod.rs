// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket ingress for the hub.

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::HubState;

/// Bound on how long one API request may occupy the server.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the axum `Router` with all hub routes.
///
/// The push-channel route sits outside the timeout layer — it upgrades to a
/// long-lived connection.
pub fn build_router(state: Arc<HubState>) -> Router {
    let api = Router::new()
        .route("/api/v1/clipboard/push", post(http::push))
        .route("/api/v1/history", get(http::history))
        .route("/api/v1/device/register", post(http::register_device))
        .route("/api/v1/health", get(http::health))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    Router::new()
        .merge(api)
        .route("/api/v1/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
