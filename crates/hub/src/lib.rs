// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TailClip hub: persists clipboard events and fans them out to peers.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::state::HubState;
use crate::store::EventStore;
use crate::transport::build_router;

/// Run the hub server until shutdown.
pub async fn run(config: HubConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let store = EventStore::open(&config.db).await?;
    let state = Arc::new(HubState::new(config, store, shutdown.clone()));

    spawn_pruner(Arc::clone(&state));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    let router = build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("tailclip-hub listening on {addr}");
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    state.store.close().await;
    Ok(())
}

/// Spawn the background retention sweep. Runs on a low-frequency interval
/// and applies both the count cap and the age cap.
fn spawn_pruner(state: Arc<HubState>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(state.config.prune_interval());
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = tick.tick() => {
                    let removed = state
                        .store
                        .prune(state.config.history_limit, state.config.retention_days)
                        .await;
                    match removed {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(removed = n, "pruned event history"),
                        Err(e) => tracing::warn!(err = %e, "history prune failed"),
                    }
                }
            }
        }
    });
}
