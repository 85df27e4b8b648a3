// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory doubles for the clipboard and notifier ports, shared by unit
//! tests and the end-to-end suite.

use std::sync::{Mutex, MutexGuard};

use crate::clipboard::Clipboard;
use crate::notify::Notifier;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clipboard held entirely in memory.
pub struct MemClipboard {
    contents: Mutex<String>,
}

impl MemClipboard {
    pub fn new(initial: &str) -> Self {
        Self { contents: Mutex::new(initial.to_owned()) }
    }

    /// Directly replace the contents, as a user copy would.
    pub fn set(&self, text: &str) {
        *lock(&self.contents) = text.to_owned();
    }

    pub fn contents(&self) -> String {
        lock(&self.contents).clone()
    }
}

impl Clipboard for MemClipboard {
    fn read_text(&self) -> anyhow::Result<String> {
        Ok(self.contents())
    }

    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.set(text);
        Ok(())
    }
}

/// Clipboard whose every operation fails.
pub struct FailingClipboard;

impl Clipboard for FailingClipboard {
    fn read_text(&self) -> anyhow::Result<String> {
        anyhow::bail!("clipboard unavailable")
    }

    fn write_text(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("clipboard unavailable")
    }
}

/// Notifier that records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<(String, String)> {
        lock(&self.notes).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, summary: &str, body: &str) {
        lock(&self.notes).push((summary.to_owned(), body.to_owned()));
    }
}
