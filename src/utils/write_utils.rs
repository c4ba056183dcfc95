//! TIFF writing utilities
//!
//! Helper functions for laying out TIFF output: alignment and entry ordering.

use crate::tiff::ifd::IFDEntry;
use std::collections::HashSet;

/// Align an offset to a word (2-byte) boundary
///
/// TIFF requires value arrays and directories to begin on a word boundary.
pub fn align_to_word(offset: u64) -> u64 {
    offset + (offset & 1)
}

/// Padding bytes needed after `data_len` bytes to reach a word boundary
pub fn calculate_padding(data_len: u64) -> u64 {
    data_len & 1
}

/// Get a list of IFD entries sorted by tag number with duplicates removed
///
/// TIFF directories list each tag once, in ascending order. If multiple
/// entries have the same tag ID, only the last occurrence is kept.
pub fn get_unique_sorted_entries(entries: &[IFDEntry]) -> Vec<IFDEntry> {
    let mut unique_entries = Vec::with_capacity(entries.len());
    let mut seen_tags = HashSet::new();

    // Walk backwards so the last occurrence of each tag wins
    for entry in entries.iter().rev() {
        if seen_tags.insert(entry.tag) {
            unique_entries.push(entry.clone());
        }
    }

    unique_entries.sort_by_key(|entry| entry.tag);
    unique_entries
}
