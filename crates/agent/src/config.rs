// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Configuration for the TailClip agent.
#[derive(Debug, Clone, Parser)]
#[command(name = "tailclip-agent", version, about = "Per-device clipboard sync agent.")]
pub struct AgentConfig {
    /// Stable identifier for this device.
    #[arg(long, env = "TAILCLIP_DEVICE_ID")]
    pub device_id: String,

    /// Human label for this device. Defaults to the device id.
    #[arg(long, env = "TAILCLIP_DEVICE_NAME")]
    pub device_name: Option<String>,

    /// Base URL of the hub (e.g. http://hub:9750).
    #[arg(long, env = "TAILCLIP_HUB_URL")]
    pub hub_url: String,

    /// Shared secret presented to the hub.
    #[arg(long, env = "TAILCLIP_SECRET")]
    pub secret: String,

    /// Participate in sync. When false the agent exits immediately.
    #[arg(long, default_value_t = true, env = "TAILCLIP_ENABLED", action = clap::ArgAction::Set)]
    pub enabled: bool,

    /// Clipboard poll interval in milliseconds.
    #[arg(long, default_value_t = 1000, env = "TAILCLIP_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Interval between dedup-cache sweeps in seconds.
    #[arg(long, default_value_t = 60, env = "TAILCLIP_PRUNE_INTERVAL_SECS")]
    pub prune_interval_secs: u64,

    /// Show a desktop-style notification when a remote clip is applied.
    #[arg(long, default_value_t = false, env = "TAILCLIP_NOTIFY", action = clap::ArgAction::Set)]
    pub notify: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TAILCLIP_LOG_LEVEL")]
    pub log_level: String,
}

impl AgentConfig {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.device_id.is_empty() {
            anyhow::bail!("--device-id must not be empty");
        }
        if self.secret.is_empty() {
            anyhow::bail!("--secret must not be empty");
        }
        let url = url::Url::parse(&self.hub_url)
            .map_err(|e| anyhow::anyhow!("--hub-url is not a valid URL: {e}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!("--hub-url must be http or https");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("--poll-interval-ms must be at least 1");
        }
        Ok(())
    }

    /// Human label, falling back to the device id.
    pub fn device_name(&self) -> &str {
        self.device_name.as_deref().unwrap_or(&self.device_id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
