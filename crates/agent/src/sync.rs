// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync client: pushes local clipboard events to the hub and applies remote
//! ones delivered over the push channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tailclip_core::device::Device;
use tailclip_core::event::Event;
use tailclip_core::AUTH_HEADER;

use crate::clipboard::Clipboard;
use crate::config::AgentConfig;
use crate::dedup::{DedupCache, DEFAULT_MAX_AGE};
use crate::notify::{preview, Notifier};

/// Long-lived framed connection carrying server-initiated event delivery.
pub type PushChannel = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// What became of one inbound push-channel frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteApply {
    /// Payload written to the local clipboard.
    Applied,
    /// Frame did not parse as an event; logged and skipped.
    Malformed,
    /// Our own event echoed back; dropped.
    OwnEcho,
    /// Event id already in the cache; dropped.
    AlreadySeen,
    /// Clipboard write failed; logged and skipped.
    WriteFailed,
}

/// Agent-side client for the hub's push and push-channel APIs.
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
    device_id: String,
    device_name: String,
    cache: DedupCache,
    clipboard: Arc<dyn Clipboard>,
    notifier: Arc<dyn Notifier>,
}

impl SyncClient {
    pub fn new(
        config: &AgentConfig,
        clipboard: Arc<dyn Clipboard>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            base_url: config.hub_url.trim_end_matches('/').to_owned(),
            secret: config.secret.clone(),
            device_id: config.device_id.clone(),
            device_name: config.device_name().to_owned(),
            cache: DedupCache::new(DEFAULT_MAX_AGE),
            clipboard,
            notifier,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The dedup cache shared with the poll driver.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.contains(id)
    }

    pub fn prune_cache(&self) {
        let removed = self.cache.prune();
        if removed > 0 {
            tracing::debug!(removed, "pruned dedup cache");
        }
    }

    /// Push one locally observed event to the hub.
    ///
    /// The event id goes into the cache before the request leaves: a fast
    /// hub broadcast could otherwise race ahead of the cache update and make
    /// our own event look foreign.
    pub async fn push(&self, event: &Event) -> anyhow::Result<()> {
        self.cache.add(&event.event_id);

        let url = format!("{}/api/v1/clipboard/push", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.secret)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            anyhow::bail!("push rejected: {status}");
        }
        Ok(())
    }

    /// Register this device with the hub (also serves as the heartbeat).
    pub async fn register(&self) -> anyhow::Result<()> {
        let device = Device {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
            tailscale_ip: None,
            last_seen_utc: chrono::Utc::now(),
            enabled: true,
        };

        let url = format!("{}/api/v1/device/register", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.secret)
            .json(&device)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            anyhow::bail!("registration rejected: {status}");
        }
        Ok(())
    }

    /// Push-channel URL: the hub URL with its scheme rewritten to the
    /// WebSocket equivalent and the token and device id in the query string.
    pub fn ws_url(&self) -> anyhow::Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => anyhow::bail!("unsupported hub URL scheme: {other}"),
        };
        url.set_scheme(scheme)
            .map_err(|()| anyhow::anyhow!("hub URL does not accept scheme {scheme}"))?;
        url.set_path("/api/v1/ws");
        url.query_pairs_mut()
            .clear()
            .append_pair("token", &self.secret)
            .append_pair("device_id", &self.device_id);
        Ok(url)
    }

    /// Open the long-lived push channel.
    pub async fn connect_push_channel(&self) -> anyhow::Result<PushChannel> {
        let url = self.ws_url()?;
        let (channel, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(channel)
    }

    /// Drive the consumer loop on a connected push channel until it dies.
    ///
    /// One bad frame never kills the loop; only a transport error or close
    /// does, and the supervisor reconnects.
    pub async fn receive(&self, mut channel: PushChannel, notify_enabled: bool) {
        while let Some(frame) = channel.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    self.apply_remote(text.as_str(), notify_enabled);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("push channel closed by hub");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(err = %e, "push channel read error");
                    break;
                }
            }
        }
    }

    /// Handle one inbound frame: parse, filter echoes and repeats, then
    /// mirror the payload into the local clipboard.
    pub fn apply_remote(&self, raw: &str, notify_enabled: bool) -> RemoteApply {
        let event: Event = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(err = %e, "malformed push-channel frame");
                return RemoteApply::Malformed;
            }
        };

        if event.source_device_id == self.device_id {
            return RemoteApply::OwnEcho;
        }
        if self.cache.contains(&event.event_id) {
            return RemoteApply::AlreadySeen;
        }

        // Both identifiers go in before the write so the next poll tick
        // recognizes the resulting clipboard change as sync-originated.
        self.cache.add(&event.event_id);
        self.cache.add(&event.text_hash);

        if let Err(e) = self.clipboard.write_text(&event.text) {
            tracing::warn!(err = %e, event_id = %event.event_id, "clipboard write failed");
            return RemoteApply::WriteFailed;
        }

        tracing::debug!(
            event_id = %event.event_id,
            source = %event.source_device_id,
            "applied remote clip"
        );
        if notify_enabled {
            self.notifier.notify("Clipboard synced", &preview(&event.text));
        }
        RemoteApply::Applied
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
