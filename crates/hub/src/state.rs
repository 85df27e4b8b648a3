// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::config::HubConfig;
use crate::store::EventStore;

/// Shared hub state.
pub struct HubState {
    pub config: HubConfig,
    pub store: EventStore,
    pub broadcaster: Broadcaster,
    pub shutdown: CancellationToken,
}

impl HubState {
    pub fn new(config: HubConfig, store: EventStore, shutdown: CancellationToken) -> Self {
        Self { config, store, broadcaster: Broadcaster::new(), shutdown }
    }
}
