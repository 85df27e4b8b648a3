// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll driver: samples the clipboard on a fixed interval and decides
//! whether a change is user-originated (push it) or sync-originated
//! (drop it).

use tailclip_core::event::Event;
use tailclip_core::hash::sha256_hex;

use crate::clipboard::Clipboard;
use crate::dedup::DedupCache;

/// Hash of the clipboard at startup, so pre-existing content is never
/// pushed. An empty or unreadable clipboard hashes to the empty string.
pub fn initial_hash(clipboard: &dyn Clipboard) -> String {
    match clipboard.read_text() {
        Ok(text) if !text.is_empty() => sha256_hex(&text),
        Ok(_) => String::new(),
        Err(e) => {
            tracing::debug!(err = %e, "clipboard read failed at startup");
            String::new()
        }
    }
}

/// Decide what one poll tick should do. Returns the event to push, if any.
///
/// `last_hash` is updated as soon as a change is detected — before any
/// network work — so a slow or failing push cannot cause the same change to
/// be re-detected every tick. A hash already in the dedup cache means the
/// change was written by our own remote-apply and must not be pushed.
pub fn evaluate_tick(
    clipboard: &dyn Clipboard,
    cache: &DedupCache,
    last_hash: &mut String,
    device_id: &str,
) -> Option<Event> {
    let text = match clipboard.read_text() {
        Ok(text) => text,
        Err(e) => {
            // Read errors count as "no change".
            tracing::debug!(err = %e, "clipboard read failed");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }

    let current_hash = sha256_hex(&text);
    if current_hash == *last_hash {
        return None;
    }
    *last_hash = current_hash.clone();

    if cache.contains(&current_hash) {
        tracing::debug!("clipboard change originated from sync; not pushing");
        return None;
    }

    let event = Event::text(device_id, text);
    cache.add(&event.event_id);
    cache.add(&event.text_hash);
    Some(event)
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
