//! Tests for the per-thread error slot

use std::thread;

use crate::session::error_channel::{self, bounded, CHANNEL_CAPACITY};

#[test]
fn test_set_read_and_clear() {
    error_channel::set("first");
    error_channel::set("second");
    assert_eq!(error_channel::last_error(), "second");

    error_channel::clear();
    assert!(error_channel::last_error().is_empty());
}

#[test]
fn test_handler_formats_into_the_slot() {
    error_channel::clear();

    error_channel::record("mem", format_args!("Bad value {} for \"{}\" tag", 9, "Orientation"));

    assert_eq!(error_channel::last_error(), "Bad value 9 for \"Orientation\" tag");
}

#[test]
fn test_long_messages_are_truncated() {
    let long = "x".repeat(2000);
    error_channel::set(&long);

    let stored = error_channel::last_error();
    assert_eq!(stored.len(), CHANNEL_CAPACITY - 1);
    assert!(long.starts_with(&stored));
}

#[test]
fn test_truncation_respects_char_boundaries() {
    let accented = "é".repeat(300);

    let cut = bounded(&accented);
    assert_eq!(cut.len(), 510);
    assert_eq!(cut.chars().count(), 255);
    assert_eq!(bounded("short"), "short");
}

#[test]
fn test_slots_are_per_thread() {
    error_channel::set("main thread");

    let handles: Vec<_> = (0..4)
        .map(|i| thread::spawn(move || {
            assert!(error_channel::last_error().is_empty());
            let message = format!("worker {}", i);
            for _ in 0..100 {
                error_channel::set(&message);
                thread::yield_now();
                assert_eq!(error_channel::last_error(), message);
            }
        }))
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(error_channel::last_error(), "main thread");
}

#[test]
fn test_sessions_reinstall_the_handler() {
    use crate::session::{decode, DecodeLimits};
    use crate::tiff::diagnostics::{report_error, set_error_handler};
    use crate::tiff::TiffError;

    set_error_handler(None);
    assert!(decode(&[0u8; 16], &DecodeLimits::default()).is_err());

    error_channel::clear();
    report_error("channel", &TiffError::GenericError("routed to the slot".to_string()));
    assert_eq!(error_channel::last_error(), "routed to the slot");
}
