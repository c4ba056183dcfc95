//! IFD utilities
//!
//! Utilities for working with Image File Directories (IFDs) in TIFF streams.

use log::debug;
use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};

/// Reads an IFD offset (the header's first offset or a directory's next offset)
pub fn read_ifd_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    byte_order_handler: &dyn ByteOrderHandler
) -> TiffResult<u64> {
    if is_big_tiff {
        debug!("Reading BigTIFF IFD offset");
        byte_order_handler.read_u64(reader).map_err(TiffError::IoError)
    } else {
        debug!("Reading standard TIFF IFD offset");
        byte_order_handler.read_u32(reader)
            .map(|v| v as u64)
            .map_err(TiffError::IoError)
    }
}

/// Calculates the size of an IFD in bytes, `None` if it overflows
pub fn calculate_ifd_size(entry_count: u64, is_big_tiff: bool) -> Option<u64> {
    // Entry count field, entries, next-IFD offset
    let (count_size, entry_size, offset_size) = if is_big_tiff { (8, 20, 8) } else { (2, 12, 4) };
    entry_count.checked_mul(entry_size)?
        .checked_add(count_size + offset_size)
}
