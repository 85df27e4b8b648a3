// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use tailclip_core::AUTH_HEADER;

use crate::error::{ErrorResponse, HubError};
use crate::state::HubState;

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a presented token against the configured secret.
///
/// Empty tokens on either side always fail.
pub fn validate_token(provided: &str, expected: &str) -> Result<(), HubError> {
    if provided.is_empty() || expected.is_empty() {
        return Err(HubError::Unauthorized);
    }
    if constant_time_eq(provided, expected) {
        Ok(())
    } else {
        Err(HubError::Unauthorized)
    }
}

/// Extract a `token` value from a raw query string, percent-decoded.
pub fn token_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

/// Front door: try the `X-Auth-Token` header first, then the `token` query
/// parameter (the fallback exists for the push-channel upgrade handshake,
/// where custom headers are not portable).
pub fn authenticate(headers: &HeaderMap, query: &str, expected: &str) -> bool {
    if let Some(token) = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok()) {
        if validate_token(token, expected).is_ok() {
            return true;
        }
    }
    match token_from_query(query) {
        Some(token) => validate_token(&token, expected).is_ok(),
        None => false,
    }
}

/// Axum middleware that enforces shared-secret authentication.
///
/// Exempt: `/api/v1/health` and the push-channel upgrade (`/api/v1/ws`),
/// which validates its query token in the handler before upgrading.
pub async fn auth_layer(
    state: State<Arc<HubState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if path == "/api/v1/health" || path == "/api/v1/ws" {
        return next.run(req).await;
    }

    let query = req.uri().query().unwrap_or("");
    if !authenticate(req.headers(), query, &state.config.secret) {
        let code = HubError::Unauthorized;
        let body = ErrorResponse { error: code.to_error_body("missing or invalid auth token") };
        return (
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::UNAUTHORIZED),
            axum::Json(body),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
