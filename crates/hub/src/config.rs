// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Configuration for the TailClip hub.
#[derive(Debug, Clone, Parser)]
#[command(name = "tailclip-hub", version, about = "Central clipboard sync hub.")]
pub struct HubConfig {
    /// Host address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "TAILCLIP_HUB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9750, env = "TAILCLIP_HUB_PORT")]
    pub port: u16,

    /// Shared secret all agents must present.
    #[arg(long, env = "TAILCLIP_SECRET")]
    pub secret: String,

    /// Path to the SQLite event database.
    #[arg(long, default_value = "tailclip.db", env = "TAILCLIP_DB")]
    pub db: PathBuf,

    /// Maximum number of events retained in the history.
    #[arg(long, default_value_t = 1000, env = "TAILCLIP_HISTORY_LIMIT")]
    pub history_limit: u32,

    /// Events older than this many days are pruned.
    #[arg(long, default_value_t = 30, env = "TAILCLIP_RETENTION_DAYS")]
    pub retention_days: u32,

    /// Interval between retention sweeps in seconds.
    #[arg(long, default_value_t = 300, env = "TAILCLIP_PRUNE_INTERVAL_SECS")]
    pub prune_interval_secs: u64,

    /// Log format (json or text).
    #[arg(long, default_value = "text", env = "TAILCLIP_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TAILCLIP_LOG_LEVEL")]
    pub log_level: String,
}

impl HubConfig {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.is_empty() {
            anyhow::bail!("--secret must not be empty");
        }
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!("--log-format must be text or json");
        }
        if self.history_limit == 0 {
            anyhow::bail!("--history-limit must be at least 1");
        }
        Ok(())
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
