// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the hub API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use tailclip_core::device::Device;
use tailclip_core::event::{Event, MAX_TEXT_BYTES};

use crate::error::HubError;
use crate::state::HubState;

/// Page size for `/api/v1/history`.
const HISTORY_PAGE: u32 = 50;

// -- Response types -----------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub peers: usize,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_owned(), peers: s.broadcaster.count() })
}

/// `POST /api/v1/clipboard/push` — ingest one clipboard event.
///
/// Ordering is load-bearing: the insert must succeed before fan-out, so no
/// peer ever observes an event that `/api/v1/history` cannot replay.
pub async fn push(State(s): State<Arc<HubState>>, body: Bytes) -> impl IntoResponse {
    let mut event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            return HubError::BadRequest
                .to_http_response(format!("invalid event: {e}"))
                .into_response();
        }
    };

    if event.event_id.is_empty() || event.source_device_id.is_empty() {
        return HubError::BadRequest
            .to_http_response("event_id and source_device_id are required")
            .into_response();
    }
    if event.text.len() > MAX_TEXT_BYTES {
        return HubError::BadRequest
            .to_http_response(format!("text exceeds {MAX_TEXT_BYTES} bytes"))
            .into_response();
    }

    let inserted = match s.store.insert(&mut event).await {
        Ok(inserted) => inserted,
        Err(e) => {
            tracing::error!(err = %e, event_id = %event.event_id, "event insert failed");
            return HubError::Storage.to_http_response("event insert failed").into_response();
        }
    };

    // Registry updates are observability-only and never fail the push.
    if let Err(e) = s.store.touch_device(&event.source_device_id, Utc::now()).await {
        tracing::warn!(err = %e, device = %event.source_device_id, "device touch failed");
    }

    if inserted {
        let reached = s.broadcaster.broadcast(&event);
        tracing::debug!(
            event_id = %event.event_id,
            source = %event.source_device_id,
            reached,
            "event broadcast"
        );
    } else {
        tracing::debug!(event_id = %event.event_id, "duplicate event absorbed");
    }

    (StatusCode::CREATED, Json(PushResponse { status: "ok".to_owned() })).into_response()
}

/// `GET /api/v1/history` — most recent events, newest first.
pub async fn history(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    match s.store.recent(HISTORY_PAGE).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            tracing::error!(err = %e, "history query failed");
            HubError::Storage.to_http_response("history query failed").into_response()
        }
    }
}

/// `POST /api/v1/device/register` — register or heartbeat a device.
pub async fn register_device(State(s): State<Arc<HubState>>, body: Bytes) -> impl IntoResponse {
    let mut device: Device = match serde_json::from_slice(&body) {
        Ok(device) => device,
        Err(e) => {
            return HubError::BadRequest
                .to_http_response(format!("invalid device: {e}"))
                .into_response();
        }
    };

    if device.device_id.is_empty() {
        return HubError::BadRequest.to_http_response("device_id is required").into_response();
    }

    device.last_seen_utc = Utc::now();
    if let Err(e) = s.store.upsert_device(&device).await {
        tracing::error!(err = %e, device = %device.device_id, "device upsert failed");
        return HubError::Storage.to_http_response("device upsert failed").into_response();
    }

    let response = RegisterResponse {
        status: "registered".to_owned(),
        message: format!("device {} registered", device.device_id),
    };
    (StatusCode::CREATED, Json(response)).into_response()
}
