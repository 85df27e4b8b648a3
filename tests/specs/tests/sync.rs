// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end sync scenarios against the real `tailclip-hub` binary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tailclip_agent::notify::Notifier;
use tailclip_agent::poll::{evaluate_tick, initial_hash};
use tailclip_agent::sync::SyncClient;
use tailclip_agent::test_support::{MemClipboard, RecordingNotifier};
use tailclip_core::hash::sha256_hex;
use tailclip_specs::{HubProcess, SECRET};

const TIMEOUT: Duration = Duration::from_secs(10);

const HELLO_HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
const X_HASH: &str = "2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881";

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// -- Helpers ------------------------------------------------------------------

fn http() -> reqwest::Client {
    reqwest::Client::new()
}

fn event_json(id: &str, source: &str, text: &str, ts: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "event_id": id,
        "source_device_id": source,
        "timestamp": ts.to_rfc3339(),
        "content_type": "text",
        "text": text,
        "text_hash": sha256_hex(text),
    })
}

async fn push_json(
    hub: &HubProcess,
    body: &serde_json::Value,
) -> anyhow::Result<reqwest::Response> {
    Ok(http()
        .post(format!("{}/api/v1/clipboard/push", hub.base_url()))
        .header("X-Auth-Token", SECRET)
        .json(body)
        .send()
        .await?)
}

async fn fetch_history(hub: &HubProcess) -> anyhow::Result<Vec<serde_json::Value>> {
    Ok(http()
        .get(format!("{}/api/v1/history", hub.base_url()))
        .header("X-Auth-Token", SECRET)
        .send()
        .await?
        .json()
        .await?)
}

async fn connect(hub: &HubProcess, device_id: &str) -> anyhow::Result<WsStream> {
    let (ws, _) = tokio_tungstenite::connect_async(hub.ws_url(device_id)).await?;
    // Give the hub a beat to register the channel with the broadcaster.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(ws)
}

/// Next text frame within `timeout`, or `None` on silence, close, or error.
async fn recv_text(ws: &mut WsStream, timeout: Duration) -> Option<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text.to_string()),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return None,
            Ok(Some(Ok(_))) => continue,
            Err(_) => return None,
        }
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}

struct TestAgent {
    client: Arc<SyncClient>,
    clipboard: Arc<MemClipboard>,
}

fn spawn_agent(hub: &HubProcess, device_id: &str) -> anyhow::Result<TestAgent> {
    let clipboard = Arc::new(MemClipboard::new(""));
    let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
    let client = Arc::new(SyncClient::new(
        &hub.agent_config(device_id),
        Arc::clone(&clipboard) as Arc<dyn tailclip_agent::clipboard::Clipboard>,
        notifier,
    )?);
    Ok(TestAgent { client, clipboard })
}

/// Connect the agent's push channel and drive its consumer in the background.
async fn start_consumer(agent: &TestAgent) -> anyhow::Result<()> {
    let channel = agent.client.connect_push_channel().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let client = Arc::clone(&agent.client);
    tokio::spawn(async move { client.receive(channel, false).await });
    Ok(())
}

// -- Scenarios ----------------------------------------------------------------

#[tokio::test]
async fn health_needs_no_auth() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let resp = http().get(format!("{}/api/v1/health", hub.base_url())).send().await?;
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn auth_rejection_mutates_nothing() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    // No header, no query token.
    let resp = http()
        .post(format!("{}/api/v1/clipboard/push", hub.base_url()))
        .json(&event_json("e1", "a", "stolen", Utc::now()))
        .send()
        .await?;
    assert_eq!(resp.status().as_u16(), 401);

    let resp = http().get(format!("{}/api/v1/history", hub.base_url())).send().await?;
    assert_eq!(resp.status().as_u16(), 401);

    assert!(fetch_history(&hub).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn basic_sync_between_two_agents() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let agent_a = spawn_agent(&hub, "a")?;
    let agent_b = spawn_agent(&hub, "b")?;
    start_consumer(&agent_a).await?;
    start_consumer(&agent_b).await?;

    // A's user copies "hello"; the next poll tick pushes it.
    let mut last_hash_a = initial_hash(agent_a.clipboard.as_ref());
    agent_a.clipboard.set("hello");
    let event = evaluate_tick(
        agent_a.clipboard.as_ref(),
        agent_a.client.cache(),
        &mut last_hash_a,
        "a",
    )
    .ok_or_else(|| anyhow::anyhow!("poll tick produced no event"))?;
    agent_a.client.push(&event).await?;

    // B's clipboard converges on the payload, byte for byte.
    let clip_b = Arc::clone(&agent_b.clipboard);
    assert!(
        wait_until(move || clip_b.contents() == "hello", TIMEOUT).await,
        "agent b never received the clip"
    );

    // No echo-induced overwrite on A.
    assert_eq!(agent_a.clipboard.contents(), "hello");

    // Exactly one event in history, hash and origin intact.
    let history = fetch_history(&hub).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["source_device_id"], "a");
    assert_eq!(history[0]["text"], "hello");
    assert_eq!(history[0]["text_hash"], HELLO_HASH);
    Ok(())
}

#[tokio::test]
async fn loop_prevention_stops_the_echo() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let agent_b = spawn_agent(&hub, "b")?;
    start_consumer(&agent_b).await?;

    // B's poll driver booted with an empty clipboard.
    let mut last_hash_b = initial_hash(agent_b.clipboard.as_ref());

    // A (simulated raw) pushes "x"; the hub broadcasts it to B.
    let event = event_json("evt-x", "a", "x", Utc::now());
    assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);

    let clip_b = Arc::clone(&agent_b.clipboard);
    assert!(
        wait_until(move || clip_b.contents() == "x", TIMEOUT).await,
        "agent b never applied the clip"
    );

    // The receive path cached both identifiers.
    assert!(agent_b.client.is_cached("evt-x"));
    assert!(agent_b.client.is_cached(X_HASH));

    // B's next poll tick sees a changed hash, finds it cached, and stays quiet.
    let pushed = evaluate_tick(
        agent_b.clipboard.as_ref(),
        agent_b.client.cache(),
        &mut last_hash_b,
        "b",
    );
    assert!(pushed.is_none(), "sync-originated change must not be pushed");

    let history = fetch_history(&hub).await?;
    assert_eq!(history.len(), 1);
    Ok(())
}

#[tokio::test]
async fn duplicate_push_is_idempotent_and_broadcast_once() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let mut peer = connect(&hub, "b").await?;

    // The same event pushed twice, as after a perceived timeout.
    let event = event_json("evt-dup", "a", "retried clip", Utc::now());
    assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);
    assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);

    let history = fetch_history(&hub).await?;
    assert_eq!(history.len(), 1);

    // The peer sees the event exactly once.
    let first = recv_text(&mut peer, TIMEOUT).await;
    assert!(first.is_some_and(|raw| raw.contains("evt-dup")));
    let second = recv_text(&mut peer, Duration::from_millis(500)).await;
    assert!(second.is_none(), "duplicate insert must not be re-broadcast");
    Ok(())
}

#[tokio::test]
async fn reconnect_replaces_the_previous_channel() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let mut first = connect(&hub, "a").await?;
    let mut second = connect(&hub, "a").await?;

    let event = event_json("evt-reconnect", "b", "fresh channel", Utc::now());
    assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);

    // The replacement channel receives the event exactly once.
    let delivered = recv_text(&mut second, TIMEOUT).await;
    assert!(delivered.is_some_and(|raw| raw.contains("evt-reconnect")));
    let extra = recv_text(&mut second, Duration::from_millis(500)).await;
    assert!(extra.is_none());

    // The replaced channel is dead; it never sees the event.
    let stale = recv_text(&mut first, Duration::from_secs(2)).await;
    assert!(stale.is_none(), "replaced channel must not receive broadcasts");
    Ok(())
}

#[tokio::test]
async fn history_returns_the_newest_fifty() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let base = Utc::now();
    for i in 0..75i64 {
        let event = event_json(
            &format!("evt-{i:03}"),
            "a",
            &format!("clip {i}"),
            base + chrono::Duration::seconds(i),
        );
        assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);
    }

    let history = fetch_history(&hub).await?;
    assert_eq!(history.len(), 50);

    let timestamps: Vec<&str> =
        history.iter().filter_map(|e| e["timestamp"].as_str()).collect();
    assert_eq!(timestamps.len(), 50);
    for pair in timestamps.windows(2) {
        assert!(pair[0] > pair[1], "history not in strictly descending order");
    }
    assert_eq!(history[0]["event_id"], "evt-074");
    assert_eq!(history[49]["event_id"], "evt-025");
    Ok(())
}

#[tokio::test]
async fn fanout_skips_the_origin() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let mut origin = connect(&hub, "a").await?;
    let mut peer = connect(&hub, "b").await?;

    let event = event_json("evt-skip", "a", "only for others", Utc::now());
    assert_eq!(push_json(&hub, &event).await?.status().as_u16(), 201);

    let delivered = recv_text(&mut peer, TIMEOUT).await;
    assert!(delivered.is_some_and(|raw| raw.contains("evt-skip")));

    let echoed = recv_text(&mut origin, Duration::from_millis(500)).await;
    assert!(echoed.is_none(), "origin must not receive its own event");
    Ok(())
}

#[tokio::test]
async fn push_channel_rejects_bad_token() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let url = format!("ws://127.0.0.1:{}/api/v1/ws?token=wrong&device_id=a", hub.port());
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
    Ok(())
}

#[tokio::test]
async fn push_channel_requires_device_id() -> anyhow::Result<()> {
    let hub = HubProcess::start()?;
    hub.wait_healthy(TIMEOUT).await?;

    let url = format!("ws://127.0.0.1:{}/api/v1/ws?token={SECRET}", hub.port());
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
    Ok(())
}
