// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Participating device records, kept by the hub for observability.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long after its last heartbeat a device still counts as online.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(300);

/// A device registered with the hub.
///
/// `tailscale_ip` is recorded but never consulted for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailscale_ip: Option<String>,
    #[serde(default = "zero_time")]
    pub last_seen_utc: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn zero_time() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

fn default_enabled() -> bool {
    true
}

impl Device {
    /// True iff the device heartbeated within `window` of `now`.
    pub fn is_online(&self, now: DateTime<Utc>, window: Duration) -> bool {
        (now - self.last_seen_utc).num_seconds() < window.as_secs() as i64
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
