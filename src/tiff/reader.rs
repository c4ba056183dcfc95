//! TIFF stream reader implementation
//!
//! This module implements the TIFF/BigTIFF header and directory reader that
//! uses the Strategy pattern to handle different byte orders.

use log::{debug, info};
use std::io::{Cursor, SeekFrom};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::field_types;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::format_utils;
use crate::utils::ifd_utils;
use crate::utils::tag_utils;

/// Reader for TIFF and BigTIFF streams
///
/// Only the first image directory is read; further pages are not decoded.
pub struct TiffReader {
    /// Current byte order handler
    pub(crate) byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    pub(crate) is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Returns the byte order handler, with proper error handling for None case
    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Reads the header and first directory of a TIFF stream
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read the first IFD
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        debug!("Reader::read starting");

        self.byte_order_handler = Some(format_utils::detect_byte_order(reader)?);

        let handler = self.handler()?;
        let (is_big_tiff, _) = format_utils::detect_tiff_format(reader, handler)?;
        self.is_big_tiff = is_big_tiff;

        let handler = self.handler()?;
        let first_ifd_offset = ifd_utils::read_ifd_offset(reader, self.is_big_tiff, handler)
            .map_err(|_| TiffError::InvalidHeader)?;
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff);
        let ifd = self.read_ifd(reader, first_ifd_offset, 0)?;

        // Multi-page streams are accepted; only the first page is used
        match ifd_utils::read_ifd_offset(reader, self.is_big_tiff, handler) {
            Ok(next) if next != 0 => debug!("Ignoring directories after the first (next at {})", next),
            Ok(_) => {}
            Err(e) => debug!("No next IFD offset after first directory: {}", e),
        }

        tiff.ifds.push(ifd);

        info!("Read TIFF header ({}) and first IFD",
              if self.is_big_tiff { "BigTIFF" } else { "TIFF" });
        Ok(tiff)
    }

    /// Reads an IFD from the reader
    ///
    /// An IFD consists of an entry count followed by the entries themselves.
    /// The reader is left positioned at the next-IFD offset field.
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = self.read_ifd_entry_count(reader)?;
        debug!("IFD entry count: {}", entry_count);

        let file_size = validation::get_file_size(reader)?;
        let directory_end = ifd_utils::calculate_ifd_size(entry_count, self.is_big_tiff)
            .and_then(|size| offset.checked_add(size));
        if entry_count == 0 || directory_end.map_or(true, |end| end > file_size) {
            return Err(TiffError::GenericError(format!(
                "Cannot read TIFF directory at offset {}: {} entries do not fit in {} bytes",
                offset, entry_count, file_size)));
        }

        let mut ifd = IFD::new(number, offset);

        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        debug!("{}", ifd);
        Ok(ifd)
    }

    /// Reads the entry count from an IFD
    fn read_ifd_entry_count(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            handler.read_u64(reader).map_err(TiffError::IoError)
        } else {
            handler.read_u16(reader)
                .map(|v| v as u64)
                .map_err(TiffError::IoError)
        }
    }

    /// Reads a single IFD entry
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_size = if self.is_big_tiff { 8 } else { 4 };
        let mut raw_value = [0u8; 8];
        reader.read_exact(&mut raw_value[..field_size])?;

        let mut entry = IFDEntry::with_raw_value(tag, field_type, count, 0, raw_value);
        entry.value_offset = self.decode_value_field(&entry)?;

        Ok(entry)
    }

    /// Interprets an entry's value field: a single inline value, or an offset
    fn decode_value_field(&self, entry: &IFDEntry) -> TiffResult<u64> {
        let handler = self.handler()?;
        let field_size = if self.is_big_tiff { 8 } else { 4 };
        let mut cursor = Cursor::new(&entry.raw_value[..field_size]);

        if entry.count == 1 && entry.is_value_inline(self.is_big_tiff) {
            let mut values = Vec::with_capacity(1);
            match tag_utils::read_tag_value_array(&mut cursor, entry, handler, &mut values) {
                Ok(()) => return Ok(values[0]),
                // Unknown field types keep the raw field; only their offset matters
                Err(TiffError::UnsupportedFieldType(_)) => cursor.set_position(0),
                Err(e) => return Err(e),
            }
        }

        if self.is_big_tiff {
            Ok(handler.read_u64(&mut cursor)?)
        } else {
            Ok(handler.read_u32(&mut cursor)? as u64)
        }
    }

    /// Reads a tag's value as a vector of u64
    ///
    /// Handles both values stored inline in the entry and value arrays
    /// stored elsewhere in the stream.
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(TiffError::TagNotFound(tag))?;
        let handler = self.handler()?;

        if entry.is_value_inline(self.is_big_tiff) {
            let field_size = if self.is_big_tiff { 8 } else { 4 };
            let mut cursor = Cursor::new(&entry.raw_value[..field_size]);
            let mut values = Vec::with_capacity(entry.count as usize);
            tag_utils::read_tag_value_array(&mut cursor, entry, handler, &mut values)?;
            return Ok(values);
        }

        if entry.field_type == field_types::DOUBLE {
            return Err(TiffError::UnsupportedFieldType(entry.field_type));
        }

        let byte_len = (entry.get_field_type_size() as u64).saturating_mul(entry.count);
        let file_size = validation::get_file_size(reader)?;
        if entry.value_offset.saturating_add(byte_len) > file_size {
            return Err(TiffError::GenericError(format!(
                "Values of tag {} ({}) lie outside the stream ({} bytes at offset {})",
                tag, tag_utils::get_tag_name(tag), byte_len, entry.value_offset)));
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut values = Vec::with_capacity(entry.count as usize);
        tag_utils::read_tag_value_array(reader, entry, handler, &mut values)?;

        Ok(values)
    }

    /// Byte order of the stream, once the header has been read
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order_handler.as_ref().map(|handler| handler.byte_order())
    }

    /// Returns whether the current stream is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}
