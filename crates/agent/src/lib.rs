// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TailClip agent: watches the local clipboard, pushes changes to the hub,
//! and mirrors remote changes back in.

pub mod clipboard;
pub mod config;
pub mod dedup;
pub mod notify;
pub mod poll;
pub mod sync;
pub mod test_support;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::AgentConfig;
use crate::notify::{LogNotifier, Notifier};
use crate::sync::SyncClient;

/// Delay before the push-channel consumer reconnects after termination.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Interval between registration heartbeats.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    static CRYPTO_INIT: std::sync::Once = std::sync::Once::new();
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Run the agent until shutdown.
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    ensure_crypto();

    if !config.enabled {
        tracing::info!("agent disabled by configuration; exiting");
        return Ok(());
    }

    let clipboard: Arc<dyn Clipboard> = Arc::new(SystemClipboard::new()?);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let client = Arc::new(SyncClient::new(&config, Arc::clone(&clipboard), notifier)?);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        });
    }

    spawn_registration(Arc::clone(&client), shutdown.clone());
    spawn_consumer(Arc::clone(&client), config.notify, shutdown.clone());

    tracing::info!(device = %config.device_id, hub = %config.hub_url, "tailclip-agent running");

    let mut last_hash = poll::initial_hash(clipboard.as_ref());
    let mut poll_tick = tokio::time::interval(config.poll_interval());
    poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut prune_tick = tokio::time::interval(config.prune_interval());
    prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            _ = poll_tick.tick() => {
                let event = poll::evaluate_tick(
                    clipboard.as_ref(),
                    client.cache(),
                    &mut last_hash,
                    &config.device_id,
                );
                if let Some(event) = event {
                    // Errors are logged and dropped; the next change retries
                    // naturally.
                    if let Err(e) = client.push(&event).await {
                        tracing::warn!(err = %e, event_id = %event.event_id, "push failed");
                    }
                }
            }

            _ = prune_tick.tick() => client.prune_cache(),
        }
    }

    tracing::info!("tailclip-agent stopped");
    Ok(())
}

/// Register with the hub, then re-register periodically as a heartbeat.
fn spawn_registration(client: Arc<SyncClient>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        // Initial registration with backoff — the hub may not be up yet.
        for attempt in 0..5u32 {
            if shutdown.is_cancelled() {
                return;
            }
            match client.register().await {
                Ok(()) => {
                    tracing::info!(device = %client.device_id(), "registered with hub");
                    break;
                }
                Err(e) => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    tracing::debug!(err = %e, attempt, "registration failed; retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    if let Err(e) = client.register().await {
                        tracing::debug!(err = %e, "heartbeat registration failed");
                    }
                }
            }
        }
    });
}

/// Supervise the push-channel consumer: connect, drain until it dies, wait,
/// reconnect. Independent of the poll loop — neither blocks the other.
fn spawn_consumer(client: Arc<SyncClient>, notify_enabled: bool, shutdown: CancellationToken) {
    tokio::spawn(async move {
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match client.connect_push_channel().await {
                Ok(channel) => {
                    tracing::info!("push channel connected");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        () = client.receive(channel, notify_enabled) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "push channel connect failed");
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    });
}
