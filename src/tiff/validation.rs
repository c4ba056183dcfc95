//! TIFF validation utilities
//!
//! Validation functions that keep a malformed or truncated stream from
//! driving reads outside the buffer or oversized allocations.

use log::{debug, error};
use std::io::SeekFrom;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::header;

/// Validates an IFD offset to ensure it's within reasonable bounds
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < header::TIFF_HEADER_SIZE {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (stream size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Gets the stream size, restoring the current position afterwards
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Validates the BigTIFF header
///
/// In BigTIFF, after the version number (43) comes the offset size (always 8)
/// and a reserved word (always 0).
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}", offset_size);
    debug!("BigTIFF zeros: {}", zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Checks that a strip or tile lies entirely inside the stream
pub fn validate_chunk(chunk: usize, offset: u64, byte_count: u64, file_size: u64) -> TiffResult<()> {
    let in_bounds = offset.checked_add(byte_count)
        .map(|end| end <= file_size)
        .unwrap_or(false);

    if !in_bounds {
        return Err(TiffError::ChunkReadError {
            chunk,
            offset,
            wanted: byte_count,
            available: file_size,
        });
    }

    Ok(())
}
