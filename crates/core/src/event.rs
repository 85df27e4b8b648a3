// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One observed clipboard change, with identity, origin, time, and payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::sha256_hex;

/// The only content type agents currently produce. Other tags are accepted
/// and stored unchanged for forward compatibility.
pub const CONTENT_TYPE_TEXT: &str = "text";

/// Maximum clipboard payload size in UTF-8 bytes (1 MiB).
pub const MAX_TEXT_BYTES: usize = 1_048_576;

/// A single clipboard change event as carried on the wire.
///
/// `event_id` is assigned by the producing agent before the event leaves its
/// origin. `timestamp` is monotonic within one agent but not globally
/// ordered. `text_hash` is the lowercase hex SHA-256 of the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub source_device_id: String,
    #[serde(default = "zero_time")]
    pub timestamp: DateTime<Utc>,
    pub content_type: String,
    pub text: String,
    #[serde(default)]
    pub text_hash: String,
}

/// Unset-timestamp sentinel: the Unix epoch, matching a zero time value
/// from producers that omit the field.
fn zero_time() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl Event {
    /// Build a fully-populated text event originating from `source_device_id`.
    pub fn text(source_device_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let text_hash = sha256_hex(&text);
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            source_device_id: source_device_id.into(),
            timestamp: Utc::now(),
            content_type: CONTENT_TYPE_TEXT.to_owned(),
            text,
            text_hash,
        }
    }

    /// Fill in fields a producer may have left unset: an epoch timestamp
    /// becomes `now`, an empty hash is recomputed from the payload.
    pub fn normalize(&mut self, now: DateTime<Utc>) {
        if self.timestamp == DateTime::UNIX_EPOCH {
            self.timestamp = now;
        }
        if self.text_hash.is_empty() {
            self.text_hash = sha256_hex(&self.text);
        }
    }

    /// True if the stored hash matches the payload.
    pub fn hash_consistent(&self) -> bool {
        self.text_hash == sha256_hex(&self.text)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
