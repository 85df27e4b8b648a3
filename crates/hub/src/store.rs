// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed event log and device registry.
//!
//! Events are keyed by `event_id`; inserts are idempotent so agent retries
//! across transient failures are absorbed without duplicate rows. Timestamps
//! are stored as fixed-width RFC-3339 UTC text (microsecond precision) so
//! `ORDER BY timestamp` is chronological.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use tailclip_core::device::Device;
use tailclip_core::event::Event;

/// Durable store for clipboard events and device records.
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open or create the database at `path`, running migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Open an in-memory database (tests). Capped at one connection —
    /// every connection to `sqlite::memory:` gets its own private database.
    pub async fn in_memory() -> Result<Self> {
        let pool =
            SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                event_id TEXT PRIMARY KEY,
                source_device_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                content_type TEXT NOT NULL,
                text TEXT NOT NULL,
                text_hash TEXT NOT NULL
            ) STRICT
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                device_id TEXT PRIMARY KEY,
                device_name TEXT NOT NULL,
                tailscale_ip TEXT,
                last_seen_utc TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1
            ) STRICT
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_source ON events(source_device_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_text_hash ON events(text_hash)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert an event, normalizing unset fields first.
    ///
    /// Idempotent on `event_id`: a duplicate insert is silently discarded.
    /// Returns true iff a new row actually landed.
    pub async fn insert(&self, event: &mut Event) -> Result<bool> {
        event.normalize(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, source_device_id, timestamp, content_type, text, text_hash)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.source_device_id)
        .bind(format_ts(event.timestamp))
        .bind(&event.content_type)
        .bind(&event.text)
        .bind(&event.text_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return at most `limit` events, newest first. Ties on timestamp break
    /// stably by `event_id`.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, source_device_id, timestamp, content_type, text, text_hash
            FROM events
            ORDER BY timestamp DESC, event_id
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }

    /// Total number of stored events.
    pub async fn event_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Apply both retention policies: drop events beyond the newest
    /// `history_limit`, and events older than `retention_days`. Returns the
    /// number of rows removed.
    pub async fn prune(&self, history_limit: u32, retention_days: u32) -> Result<u64> {
        let cutoff = format_ts(Utc::now() - chrono::Duration::days(i64::from(retention_days)));
        let aged = sqlx::query("DELETE FROM events WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let over_cap = sqlx::query(
            r#"
            DELETE FROM events WHERE event_id NOT IN (
                SELECT event_id FROM events ORDER BY timestamp DESC, event_id LIMIT ?
            )
            "#,
        )
        .bind(i64::from(history_limit))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(aged + over_cap)
    }

    /// Insert-or-replace a device record. Registration always refreshes
    /// `last_seen_utc`; records are never deleted (disabling is a flag).
    pub async fn upsert_device(&self, device: &Device) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO devices (device_id, device_name, tailscale_ip, last_seen_utc, enabled)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(device_id) DO UPDATE SET
                device_name = excluded.device_name,
                tailscale_ip = excluded.tailscale_ip,
                last_seen_utc = excluded.last_seen_utc,
                enabled = excluded.enabled
            "#,
        )
        .bind(&device.device_id)
        .bind(&device.device_name)
        .bind(&device.tailscale_ip)
        .bind(format_ts(device.last_seen_utc))
        .bind(i64::from(device.enabled))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Refresh a device's `last_seen_utc`, creating a minimal record for a
    /// device that pushed before ever registering.
    pub async fn touch_device(&self, device_id: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO devices (device_id, device_name, tailscale_ip, last_seen_utc, enabled)
            VALUES (?, ?, NULL, ?, 1)
            ON CONFLICT(device_id) DO UPDATE SET last_seen_utc = excluded.last_seen_utc
            "#,
        )
        .bind(device_id)
        .bind(device_id)
        .bind(format_ts(now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up a single device record.
    pub async fn device(&self, device_id: &str) -> Result<Option<Device>> {
        let row = sqlx::query(
            r#"
            SELECT device_id, device_name, tailscale_ip, last_seen_utc, enabled
            FROM devices WHERE device_id = ?
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_device).transpose()
    }

    /// Total number of registered devices.
    pub async fn device_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM devices")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Flush and close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn row_to_event(row: &sqlx::sqlite::SqliteRow) -> Result<Event> {
    Ok(Event {
        event_id: row.get("event_id"),
        source_device_id: row.get("source_device_id"),
        timestamp: parse_ts(row.get::<&str, _>("timestamp"))?,
        content_type: row.get("content_type"),
        text: row.get("text"),
        text_hash: row.get("text_hash"),
    })
}

fn row_to_device(row: &sqlx::sqlite::SqliteRow) -> Result<Device> {
    Ok(Device {
        device_id: row.get("device_id"),
        device_name: row.get("device_name"),
        tailscale_ip: row.get("tailscale_ip"),
        last_seen_utc: parse_ts(row.get::<&str, _>("last_seen_utc"))?,
        enabled: row.get::<i64, _>("enabled") != 0,
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
