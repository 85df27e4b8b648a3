// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-expiring set of recently seen identifiers.
//!
//! The agent remembers both the event ids it has emitted or applied and the
//! content hashes of payloads it has written to the clipboard. Both are
//! collision-resistant strings, so one structure handles both uniformly —
//! the cache has no idea which kind it is holding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default maximum entry age.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Mapping from identifier to first-seen instant, bounded by age.
pub struct DedupCache {
    entries: Mutex<HashMap<String, Instant>>,
    max_age: Duration,
}

impl DedupCache {
    pub fn new(max_age: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), max_age }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `id` as seen now. Re-adding refreshes the entry's age.
    pub fn add(&self, id: &str) {
        self.lock().insert(id.to_owned(), Instant::now());
    }

    /// True iff `id` was added less than the maximum age ago. Stale entries
    /// are deleted on read.
    pub fn contains(&self, id: &str) -> bool {
        let mut entries = self.lock();
        match entries.get(id) {
            Some(seen) if seen.elapsed() < self.max_age => true,
            Some(_) => {
                entries.remove(id);
                false
            }
            None => false,
        }
    }

    /// Sweep out every entry older than the maximum age. Returns how many
    /// were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let max_age = self.max_age;
        entries.retain(|_, seen| seen.elapsed() < max_age);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
