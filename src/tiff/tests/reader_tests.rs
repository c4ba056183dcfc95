//! Tests for header, directory and typed-directory reading

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Cursor;

use super::test_utils::TiffFixture;
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{field_types, photometric, tags};
use crate::tiff::directory::{ChunkLayout, ImageDirectory};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::reader::TiffReader;

fn load_directory(bytes: Vec<u8>) -> TiffResult<ImageDirectory> {
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor)?;
    let ifd = tiff.main_ifd().unwrap();
    ImageDirectory::load(&reader, &mut cursor, ifd)
}

/// Classic little-endian header followed by one IFD at offset 8
fn manual_tiff(entries: &[(u16, u16, u32, u32)]) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();
    buffer.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    for &(tag, field_type, count, value) in entries {
        buffer.write_u16::<LittleEndian>(tag).unwrap();
        buffer.write_u16::<LittleEndian>(field_type).unwrap();
        buffer.write_u32::<LittleEndian>(count).unwrap();
        buffer.write_u32::<LittleEndian>(value).unwrap();
    }
    buffer.write_u32::<LittleEndian>(0).unwrap();
    buffer
}

#[test]
fn test_read_little_endian_tiff() {
    let bytes = TiffFixture::gray8(2, 2, vec![1, 2, 3, 4]).build();
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();

    assert_eq!(tiff.ifd_count(), 1);
    assert!(!tiff.is_big_tiff);
    assert_eq!(reader.byte_order(), Some(ByteOrder::LittleEndian));
    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(), Some((2, 2)));
    assert_eq!(ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION), Some(1));
}

#[test]
fn test_read_big_endian_bigtiff() {
    let bytes = TiffFixture::rgb8(3, 1, vec![0; 9]).big_endian().big_tiff().build();
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();

    assert!(reader.is_big_tiff());
    assert_eq!(reader.byte_order(), Some(ByteOrder::BigEndian));
    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_tag_value(tags::IMAGE_WIDTH), Some(3));
    assert_eq!(ifd.get_tag_value(tags::SAMPLES_PER_PIXEL), Some(3));
    assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![8, 8, 8]);
}

#[test]
fn test_inline_short_values_big_endian() {
    let bytes = TiffFixture::new(1, 1)
        .short(tags::BITS_PER_SAMPLE, &[16, 16])
        .short(tags::PHOTOMETRIC_INTERPRETATION, &[photometric::RGB])
        .strips(vec![vec![0; 4]])
        .big_endian()
        .build();
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    assert_eq!(ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION), Some(photometric::RGB as u64));
    assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![16, 16]);
}

#[test]
fn test_out_of_line_values() {
    let bytes = TiffFixture::rgb8(1, 1, vec![1, 2, 3]).build();
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    let bits = reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap();
    assert_eq!(bits, vec![8, 8, 8]);
    assert!(matches!(reader.read_tag_values(&mut cursor, ifd, tags::COLOR_MAP),
                     Err(TiffError::TagNotFound(tags::COLOR_MAP))));
}

#[test]
fn test_values_outside_stream_are_rejected() {
    let bytes = manual_tiff(&[
        (tags::IMAGE_WIDTH, field_types::LONG, 1, 4),
        (tags::IMAGE_LENGTH, field_types::LONG, 1, 4),
        (tags::BITS_PER_SAMPLE, field_types::SHORT, 3, 5000),
    ]);
    let mut cursor = Cursor::new(bytes);
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    let result = reader.read_tag_values(&mut cursor, tiff.main_ifd().unwrap(), tags::BITS_PER_SAMPLE);
    let message = result.unwrap_err().to_string();
    assert!(message.contains("outside the stream"), "{}", message);
}

#[test]
fn test_invalid_byte_order_marker() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"XX");
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();

    let result = TiffReader::new().read(&mut Cursor::new(buffer));
    assert!(matches!(result, Err(TiffError::InvalidByteOrder(_))));
}

#[test]
fn test_unsupported_version() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(41).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();

    let result = TiffReader::new().read(&mut Cursor::new(buffer));
    assert!(matches!(result, Err(TiffError::UnsupportedVersion(41))));
}

#[test]
fn test_truncated_header() {
    let result = TiffReader::new().read(&mut Cursor::new(b"II*".to_vec()));
    assert!(matches!(result, Err(TiffError::InvalidHeader)));
}

#[test]
fn test_ifd_offset_past_end() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(1000).unwrap();

    let message = TiffReader::new().read(&mut Cursor::new(buffer)).unwrap_err().to_string();
    assert!(message.starts_with("Invalid IFD offset: 1000"), "{}", message);
}

#[test]
fn test_directory_larger_than_stream() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();
    buffer.write_u16::<LittleEndian>(100).unwrap();

    let message = TiffReader::new().read(&mut Cursor::new(buffer)).unwrap_err().to_string();
    assert!(message.starts_with("Cannot read TIFF directory"), "{}", message);
}

#[test]
fn test_bigtiff_entry_count_overflow() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.write_u16::<LittleEndian>(43).unwrap();
    buffer.write_u16::<LittleEndian>(8).unwrap();
    buffer.write_u16::<LittleEndian>(0).unwrap();
    buffer.write_u64::<LittleEndian>(16).unwrap();
    // 20 bytes per entry wraps past u64::MAX
    buffer.write_u64::<LittleEndian>(0x0CCC_CCCC_CCCC_CCCD).unwrap();

    let message = TiffReader::new().read(&mut Cursor::new(buffer.clone())).unwrap_err().to_string();
    assert!(message.starts_with("Cannot read TIFF directory at offset 16"), "{}", message);

    let err = crate::api::decode(&buffer).unwrap_err();
    assert!(matches!(err, crate::api::Error::Open(_)));
}

#[test]
fn test_calculate_ifd_size() {
    use crate::utils::ifd_utils::calculate_ifd_size;

    assert_eq!(calculate_ifd_size(3, false), Some(2 + 36 + 4));
    assert_eq!(calculate_ifd_size(3, true), Some(8 + 60 + 8));
    assert_eq!(calculate_ifd_size(u64::MAX / 20, true), None);
    assert_eq!(calculate_ifd_size(u64::MAX / 12, false), None);
}

#[test]
fn test_directory_defaults() {
    let directory = load_directory(TiffFixture::gray8(4, 3, vec![0; 12]).build()).unwrap();

    assert_eq!(directory.width, 4);
    assert_eq!(directory.height, 3);
    assert_eq!(directory.samples_per_pixel, 1);
    assert_eq!(directory.compression, 1);
    assert_eq!(directory.planar_config, 1);
    assert_eq!(directory.orientation, 1);
    assert_eq!(directory.layout, ChunkLayout::Strips { rows_per_strip: 3 });
    assert_eq!(directory.chunks_per_plane(), 1);
    assert_eq!(directory.row_bytes(4), Some(4));
    assert_eq!(directory.field(tags::TILE_WIDTH), None);
    assert_eq!(directory.field(tags::ROWS_PER_STRIP), Some(3));
}

#[test]
fn test_rows_per_strip_is_clamped_to_height() {
    let bytes = TiffFixture::gray8(2, 2, vec![0; 4])
        .long(tags::ROWS_PER_STRIP, &[100])
        .build();
    let directory = load_directory(bytes).unwrap();

    assert_eq!(directory.layout, ChunkLayout::Strips { rows_per_strip: 2 });
}

#[test]
fn test_tiled_directory() {
    let bytes = TiffFixture::gray8(5, 3, Vec::new())
        .long(tags::TILE_WIDTH, &[2])
        .long(tags::TILE_LENGTH, &[2])
        .tiles(vec![vec![0; 4]; 6])
        .build();
    let directory = load_directory(bytes).unwrap();

    assert_eq!(directory.layout, ChunkLayout::Tiles { tile_width: 2, tile_length: 2 });
    assert_eq!(directory.chunks_per_plane(), 6);
    assert_eq!(directory.field(tags::TILE_LENGTH), Some(2));
}

#[test]
fn test_missing_image_length() {
    let bytes = TiffFixture::gray8(2, 2, vec![0; 4]).without(tags::IMAGE_LENGTH).build();

    let err = load_directory(bytes).unwrap_err();
    assert!(matches!(err, TiffError::MissingRequiredField("ImageLength")));
    assert_eq!(err.to_string(), "TIFF directory is missing required \"ImageLength\" field");
}

#[test]
fn test_missing_strip_byte_counts() {
    let bytes = TiffFixture::gray8(2, 2, vec![0; 4]).without(tags::STRIP_BYTE_COUNTS).build();

    let err = load_directory(bytes).unwrap_err();
    assert!(matches!(err, TiffError::MissingRequiredField("StripByteCounts")));
}

#[test]
fn test_missing_photometric_is_guessed() {
    let bytes = TiffFixture::rgb8(1, 1, vec![1, 2, 3])
        .without(tags::PHOTOMETRIC_INTERPRETATION)
        .build();

    let directory = load_directory(bytes).unwrap();
    assert_eq!(directory.photometric, photometric::RGB);
}

#[test]
fn test_too_few_strips() {
    let bytes = TiffFixture::gray8(2, 2, vec![0; 2])
        .long(tags::ROWS_PER_STRIP, &[1])
        .build();

    let message = load_directory(bytes).unwrap_err().to_string();
    assert!(message.starts_with("Too few strip/tile entries"), "{}", message);
}

#[test]
fn test_zero_sized_image() {
    let bytes = TiffFixture::gray8(0, 2, vec![0; 2]).build();

    let message = load_directory(bytes).unwrap_err().to_string();
    assert_eq!(message, "Cannot handle zero-sized image 0x2");
}
