// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification port. Desktop backends live behind this seam; the default
//! implementation just logs.

/// Surface a short user-facing message about an applied clip.
pub trait Notifier: Send + Sync {
    fn notify(&self, summary: &str, body: &str);
}

/// Logs notifications via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, summary: &str, body: &str) {
        tracing::info!("{summary}: {body}");
    }
}

/// Truncated preview of an applied payload, at most 80 characters plus an
/// ellipsis.
pub fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 80;
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
