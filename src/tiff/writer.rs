//! Append-only TIFF writing
//!
//! The output stream cannot seek backwards, so the whole file layout is
//! planned before the first byte is written:
//!
//! ```text
//! header (8) | image rows | out-of-line tag values | IFD
//! ```
//!
//! The header's first-IFD offset is therefore known up front, rows are
//! streamed as they arrive, and the directory is written last.

use log::{debug, info};
use std::io::Write;

use crate::tiff::constants::{compression, field_types, header, photometric, planar_config, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::utils::write_utils;

/// Size libtiff aims for when choosing a default strip height
const DEFAULT_STRIP_BYTES: u64 = 8192;

/// Fields of the image being written, as set through the encoder
#[derive(Debug, Clone)]
pub struct ImageFields {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub photometric: Option<u16>,
    pub planar_config: u16,
    pub orientation: u16,
    pub rows_per_strip: Option<u32>,
    pub extra_samples: Option<u16>,
}

impl Default for ImageFields {
    fn default() -> Self {
        ImageFields {
            width: None,
            height: None,
            bits_per_sample: 1,
            samples_per_pixel: 1,
            photometric: None,
            planar_config: planar_config::CHUNKY,
            orientation: 1,
            rows_per_strip: None,
            extra_samples: None,
        }
    }
}

/// Where everything goes in the output, computed before writing starts
#[derive(Debug, Clone)]
pub struct StripLayout {
    pub width: u32,
    pub height: u32,
    pub row_bytes: usize,
    pub rows_per_strip: u32,
    pub strip_count: usize,
    /// IFD with final offsets filled in
    pub ifd: IFD,
    /// Out-of-line tag values in file order
    pub external_data: Vec<(u64, Vec<u8>)>,
    /// End of the image rows
    pub image_end: u64,
    pub ifd_offset: u64,
}

/// Plans and writes the parts of an append-only TIFF
pub struct DirectoryWriter;

impl DirectoryWriter {
    /// Computes the file layout for `fields`
    ///
    /// Fails if a required field is missing or the result would not fit in a
    /// classic (32-bit offset) TIFF.
    pub fn plan(fields: &ImageFields) -> TiffResult<StripLayout> {
        let width = fields.width.ok_or(TiffError::MissingRequiredField("ImageWidth"))?;
        let height = fields.height.ok_or(TiffError::MissingRequiredField("ImageLength"))?;
        if width == 0 || height == 0 {
            return Err(TiffError::GenericError(format!(
                "Cannot write zero-sized image {}x{}", width, height)));
        }

        let photometric = fields.photometric
            .ok_or(TiffError::MissingRequiredField("PhotometricInterpretation"))?;

        let row_bits = width as u64 * fields.samples_per_pixel as u64 * fields.bits_per_sample as u64;
        let row_bytes = row_bits.div_ceil(8);
        let rows_per_strip = fields.rows_per_strip
            .unwrap_or_else(|| default_rows_per_strip(row_bytes))
            .clamp(1, height);
        let strip_count = height.div_ceil(rows_per_strip) as usize;
        let image_end = row_bytes.checked_mul(height as u64)
            .map(|image_bytes| header::TIFF_HEADER_SIZE + image_bytes)
            .filter(|&end| end <= u32::MAX as u64)
            .ok_or_else(|| TiffError::GenericError(format!(
                "Maximum TIFF file size exceeded: {}x{} image does not fit in a classic TIFF",
                width, height)))?;
        if strip_count as u64 * 8 > u32::MAX as u64 - image_end {
            return Err(TiffError::GenericError(format!(
                "Maximum TIFF file size exceeded: {} strip table entries", strip_count)));
        }

        let mut ifd = IFD::new(0, 0);
        let mut pending_external: Vec<(u16, Vec<u8>)> = Vec::new();

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, height as u64));
        Self::add_short_array(&mut ifd, &mut pending_external, tags::BITS_PER_SAMPLE,
                              &vec![fields.bits_per_sample; fields.samples_per_pixel as usize]);
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression::NONE as u64));
        ifd.add_entry(IFDEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1, photometric as u64));
        ifd.add_entry(IFDEntry::new(tags::ORIENTATION, field_types::SHORT, 1, fields.orientation as u64));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, fields.samples_per_pixel as u64));
        ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, rows_per_strip as u64));
        ifd.add_entry(IFDEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, 1, fields.planar_config as u64));
        if let Some(extra) = fields.extra_samples {
            ifd.add_entry(IFDEntry::new(tags::EXTRA_SAMPLES, field_types::SHORT, 1, extra as u64));
        }

        // Strip tables: offsets are sequential from the end of the header
        let strip_bytes = row_bytes * rows_per_strip as u64;
        let mut offsets = Vec::with_capacity(strip_count);
        let mut byte_counts = Vec::with_capacity(strip_count);
        for strip in 0..strip_count as u64 {
            let first_row = strip * rows_per_strip as u64;
            let rows = (rows_per_strip as u64).min(height as u64 - first_row);
            offsets.push(header::TIFF_HEADER_SIZE + strip * strip_bytes);
            byte_counts.push(rows * row_bytes);
        }
        Self::add_long_array(&mut ifd, &mut pending_external, tags::STRIP_OFFSETS, &offsets)?;
        Self::add_long_array(&mut ifd, &mut pending_external, tags::STRIP_BYTE_COUNTS, &byte_counts)?;

        // Place out-of-line values after the image, each on a word boundary
        let mut cursor = write_utils::align_to_word(image_end);
        let mut external_data = Vec::with_capacity(pending_external.len());
        for (tag, data) in pending_external {
            for entry in ifd.entries.iter_mut().filter(|entry| entry.tag == tag) {
                entry.value_offset = cursor;
                entry.raw_value = cursor.to_le_bytes();
            }
            let len = data.len() as u64;
            external_data.push((cursor, data));
            cursor = write_utils::align_to_word(cursor + len);
        }

        let ifd_offset = cursor;
        let mut directory = IFD::new(0, ifd_offset);
        for entry in write_utils::get_unique_sorted_entries(&ifd.entries) {
            directory.add_entry(entry);
        }

        let end = ifd_offset + Self::calculate_ifd_size(&directory);
        if end > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "Maximum TIFF file size exceeded: {} bytes needed", end)));
        }

        debug!("Planned layout: {} strips of {} rows, IFD at {}", strip_count, rows_per_strip, ifd_offset);

        Ok(StripLayout {
            width,
            height,
            row_bytes: row_bytes as usize,
            rows_per_strip,
            strip_count,
            ifd: directory,
            external_data,
            image_end,
            ifd_offset,
        })
    }

    /// Writes the classic little-endian header pointing at the planned IFD
    pub fn write_header(writer: &mut impl Write, layout: &StripLayout) -> TiffResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
        writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
        writer.write_all(&(layout.ifd_offset as u32).to_le_bytes())?;
        Ok(())
    }

    /// Writes the out-of-line values and the IFD after the last image row
    pub fn write_directory(writer: &mut impl Write, layout: &StripLayout) -> TiffResult<()> {
        let mut position = layout.image_end;

        for (offset, data) in &layout.external_data {
            Self::pad_to(writer, &mut position, *offset)?;
            writer.write_all(data)?;
            position += data.len() as u64;
        }

        Self::pad_to(writer, &mut position, layout.ifd_offset)?;
        Self::write_ifd(writer, &layout.ifd)?;

        info!("Wrote TIFF directory with {} entries at offset {}",
              layout.ifd.entry_count(), layout.ifd_offset);
        Ok(())
    }

    /// Size of a classic IFD: entry count, 12-byte entries, next-IFD offset
    fn calculate_ifd_size(ifd: &IFD) -> u64 {
        2 + (12 * ifd.entries.len() as u64) + 4
    }

    fn pad_to(writer: &mut impl Write, position: &mut u64, target: u64) -> TiffResult<()> {
        let padding = write_utils::calculate_padding(*position);
        if *position + padding != target {
            return Err(TiffError::GenericError(format!(
                "Output position {} does not match planned offset {}", *position, target)));
        }

        writer.write_all(&vec![0u8; padding as usize])?;
        *position = target;
        Ok(())
    }

    fn write_ifd(writer: &mut impl Write, ifd: &IFD) -> TiffResult<()> {
        writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?;

        for entry in &ifd.entries {
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            writer.write_all(&(entry.count as u32).to_le_bytes())?;
            writer.write_all(&entry.raw_value[..4])?;
        }

        // Single directory: no next IFD
        writer.write_all(&0u32.to_le_bytes())?;
        Ok(())
    }

    fn add_short_array(ifd: &mut IFD, external: &mut Vec<(u16, Vec<u8>)>, tag: u16, values: &[u16]) {
        let mut data = Vec::with_capacity(values.len() * 2);
        for value in values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self::add_array(ifd, external, tag, field_types::SHORT, values.len(), data);
    }

    fn add_long_array(ifd: &mut IFD, external: &mut Vec<(u16, Vec<u8>)>, tag: u16, values: &[u64]) -> TiffResult<()> {
        let mut data = Vec::with_capacity(values.len() * 4);
        for &value in values {
            let value = u32::try_from(value).map_err(|_| TiffError::GenericError(format!(
                "Maximum TIFF file size exceeded: offset {} does not fit in 32 bits", value)))?;
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self::add_array(ifd, external, tag, field_types::LONG, values.len(), data);
        Ok(())
    }

    /// Adds an array entry, inline when it fits in the 4-byte value field
    fn add_array(ifd: &mut IFD, external: &mut Vec<(u16, Vec<u8>)>, tag: u16,
                 field_type: u16, count: usize, data: Vec<u8>) {
        if data.len() <= 4 {
            let mut raw_value = [0u8; 8];
            raw_value[..data.len()].copy_from_slice(&data);
            let mut entry = IFDEntry::new(tag, field_type, count as u64, 0);
            entry.raw_value = raw_value;
            entry.value_offset = u32::from_le_bytes([raw_value[0], raw_value[1], raw_value[2], raw_value[3]]) as u64;
            ifd.add_entry(entry);
        } else {
            ifd.add_entry(IFDEntry::new(tag, field_type, count as u64, 0));
            external.push((tag, data));
        }
    }
}

/// Rows per strip giving strips of about 8 KiB, at least one row
pub fn default_rows_per_strip(row_bytes: u64) -> u32 {
    if row_bytes == 0 {
        return 1;
    }
    (DEFAULT_STRIP_BYTES / row_bytes).clamp(1, u32::MAX as u64) as u32
}

/// Checks a photometric value the encoder can describe
pub fn is_writable_photometric(value: u32) -> bool {
    matches!(u16::try_from(value), Ok(photometric::WHITE_IS_ZERO | photometric::BLACK_IS_ZERO
        | photometric::RGB | photometric::PALETTE | photometric::CMYK))
}
