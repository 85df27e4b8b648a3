// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end sync tests.
//!
//! Spawns the real `tailclip-hub` binary on a free port and exercises it
//! over HTTP and WebSocket, optionally with in-process agents backed by
//! in-memory clipboards.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

use tailclip_agent::config::AgentConfig;

/// Shared secret every spec hub is started with.
pub const SECRET: &str = "spec-secret";

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `tailclip-hub` binary.
pub fn hub_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("tailclip-hub")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `tailclip-hub` process that is killed on drop.
pub struct HubProcess {
    child: Child,
    port: u16,
    _db_dir: tempfile::TempDir,
}

impl HubProcess {
    /// Spawn a hub with a scratch database and the spec secret.
    pub fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = hub_binary();
        anyhow::ensure!(binary.exists(), "hub binary not found at {}", binary.display());

        let port = free_port()?;
        let db_dir = tempfile::tempdir()?;
        let db_path = db_dir.path().join("hub.db");

        let child = Command::new(&binary)
            .args([
                "--host",
                "127.0.0.1",
                "--port",
                &port.to_string(),
                "--secret",
                SECRET,
                "--db",
                &db_path.to_string_lossy(),
                "--log-level",
                "warn",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port, _db_dir: db_dir })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for HTTP requests.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Push-channel URL for a given device.
    pub fn ws_url(&self, device_id: &str) -> String {
        format!(
            "ws://127.0.0.1:{}/api/v1/ws?token={SECRET}&device_id={device_id}",
            self.port
        )
    }

    /// Agent configuration pointing at this hub.
    pub fn agent_config(&self, device_id: &str) -> AgentConfig {
        AgentConfig {
            device_id: device_id.to_owned(),
            device_name: None,
            hub_url: self.base_url(),
            secret: SECRET.to_owned(),
            enabled: true,
            poll_interval_ms: 50,
            prune_interval_secs: 60,
            notify: false,
            log_level: "warn".to_owned(),
        }
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("hub did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for HubProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
