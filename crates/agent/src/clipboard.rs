// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clipboard port: the sync core only ever reads or writes text through
//! this seam, so platform backends stay swappable.

use std::sync::{Mutex, MutexGuard};

/// Read/write access to the local clipboard.
pub trait Clipboard: Send + Sync {
    /// Current clipboard text. An empty clipboard reads as an empty string.
    fn read_text(&self) -> anyhow::Result<String>;

    /// Replace the clipboard contents.
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// The real system clipboard, backed by arboard.
pub struct SystemClipboard {
    inner: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { inner: Mutex::new(arboard::Clipboard::new()?) })
    }

    fn lock(&self) -> MutexGuard<'_, arboard::Clipboard> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clipboard for SystemClipboard {
    fn read_text(&self) -> anyhow::Result<String> {
        match self.lock().get_text() {
            Ok(text) => Ok(text),
            // No text on the clipboard is a normal state, not an error.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.lock().set_text(text.to_owned())?;
        Ok(())
    }
}
