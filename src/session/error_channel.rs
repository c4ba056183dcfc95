//! Per-thread last-error slot fed by the codec's error handler
//!
//! The codec reports failures through a process-wide callback. The callback
//! installed here writes into a slot owned by the calling thread, so
//! concurrent sessions on different threads never see each other's errors.
//! The slot is only meaningful right after a failing call.

use log::debug;
use std::cell::RefCell;
use std::fmt::{self, Write};

use crate::tiff::diagnostics;
use crate::tiff::errors::TiffError;

/// Slot size in bytes, terminator included
pub const CHANNEL_CAPACITY: usize = 512;

thread_local! {
    static LAST_ERROR: RefCell<String> = RefCell::new(String::with_capacity(CHANNEL_CAPACITY));
}

/// Registers the channel as the codec's error handler
///
/// Sessions call this before every operation, so a handler installed by
/// someone else in between is replaced again.
pub fn install() {
    if diagnostics::set_error_handler(Some(record)).is_none() {
        debug!("Error channel registered as codec error handler");
    }
}

pub(crate) fn record(module: &str, message: fmt::Arguments<'_>) {
    let mut text = String::new();
    if text.write_fmt(message).is_err() {
        text = format!("{}: unformattable error", module);
    }
    set(&text);
}

/// Replaces the slot contents, truncating to the channel capacity
pub fn set(message: &str) {
    let message = bounded(message);
    LAST_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        slot.clear();
        slot.push_str(message);
    });
}

/// Empties this thread's slot
pub fn clear() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}

/// Copy of this thread's last error message (empty if none)
pub fn last_error() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Snapshot to surface for a failed codec call
///
/// Falls back to the error's own text when no handler message arrived,
/// so the result is never empty.
pub(crate) fn failure_message(err: &TiffError) -> String {
    let message = last_error();
    if message.is_empty() {
        bounded(&err.to_string()).to_string()
    } else {
        message
    }
}

/// Longest prefix of `message` that fits the slot, cut on a character boundary
pub(crate) fn bounded(message: &str) -> &str {
    let max = CHANNEL_CAPACITY - 1;
    if message.len() <= max {
        return message;
    }

    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}
