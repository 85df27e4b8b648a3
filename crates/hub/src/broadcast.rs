// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out broadcaster: one live push channel per device, one pre-serialized
//! payload per event.
//!
//! The map is guarded by a single mutex held across the full fan-out
//! iteration; sends go through unbounded queues owned by each connection's
//! task, so no peer write can block another. A send failure never removes
//! the peer here — the read loop that owns the connection has authoritative
//! knowledge of liveness and performs the removal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tailclip_core::event::Event;

/// Identifies one accepted connection across reconnects of the same device.
pub type ConnId = u64;

/// Live push channel for a single device.
struct Peer {
    conn_id: ConnId,
    tx: mpsc::UnboundedSender<std::sync::Arc<str>>,
    cancel: CancellationToken,
}

/// Set of live push channels keyed by device id.
pub struct Broadcaster {
    peers: Mutex<HashMap<String, Peer>>,
    next_conn_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self { peers: Mutex::new(HashMap::new()), next_conn_id: AtomicU64::new(1) }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Peer>> {
        self.peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Install a channel for `device_id`, returning its connection id.
    ///
    /// At most one channel per device: a pre-existing entry is cancelled
    /// before the new one is installed, so a reconnecting device seamlessly
    /// replaces its old channel and never receives duplicate deliveries.
    pub fn add(
        &self,
        device_id: &str,
        tx: mpsc::UnboundedSender<std::sync::Arc<str>>,
        cancel: CancellationToken,
    ) -> ConnId {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let previous =
            self.lock().insert(device_id.to_owned(), Peer { conn_id, tx, cancel });
        if let Some(old) = previous {
            tracing::debug!(device = %device_id, "replacing existing push channel");
            old.cancel.cancel();
        }
        conn_id
    }

    /// Remove the channel for `device_id` if it still belongs to `conn_id`.
    ///
    /// The guard keeps a terminating read loop from evicting the replacement
    /// channel that raced in ahead of it. Returns true if an entry was removed.
    pub fn remove(&self, device_id: &str, conn_id: ConnId) -> bool {
        let mut peers = self.lock();
        if peers.get(device_id).is_some_and(|p| p.conn_id == conn_id) {
            peers.remove(device_id);
            true
        } else {
            false
        }
    }

    /// Queue `event` to every peer except its origin. The payload is
    /// serialized once and shared. Returns the number of peers reached.
    pub fn broadcast(&self, event: &Event) -> usize {
        let payload: std::sync::Arc<str> = match serde_json::to_string(event) {
            Ok(json) => std::sync::Arc::from(json.as_str()),
            Err(e) => {
                tracing::error!(err = %e, event_id = %event.event_id, "event serialization failed");
                return 0;
            }
        };

        let peers = self.lock();
        let mut reached = 0;
        for (device_id, peer) in peers.iter() {
            if *device_id == event.source_device_id {
                continue;
            }
            if peer.tx.send(std::sync::Arc::clone(&payload)).is_err() {
                // Removal belongs to the read loop that owns this channel.
                tracing::warn!(device = %device_id, "push channel send failed");
            } else {
                reached += 1;
            }
        }
        reached
    }

    /// Number of live push channels.
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
