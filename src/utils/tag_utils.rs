//! Tag value decoding and the names used in log and error messages

use byteorder::ReadBytesExt;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{field_types, tags, compression, photometric};

/// Reads an array of tag values based on the field type
///
/// The reader must be positioned at the first value. Rational values are
/// packed as `numerator << 32 | denominator`.
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> TiffResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => reader.read_u8()? as u64,
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(reader)? as u64,
            field_types::RATIONAL | field_types::SRATIONAL => {
                let numerator = handler.read_u32(reader)?;
                let denominator = handler.read_u32(reader)?;
                ((numerator as u64) << 32) | (denominator as u64)
            },
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

const TAG_NAMES: &[(u16, &str)] = &[
    (tags::NEW_SUBFILE_TYPE, "NewSubfileType"),
    (tags::IMAGE_WIDTH, "ImageWidth"),
    (tags::IMAGE_LENGTH, "ImageLength"),
    (tags::BITS_PER_SAMPLE, "BitsPerSample"),
    (tags::COMPRESSION, "Compression"),
    (tags::PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation"),
    (tags::FILL_ORDER, "FillOrder"),
    (tags::STRIP_OFFSETS, "StripOffsets"),
    (tags::ORIENTATION, "Orientation"),
    (tags::SAMPLES_PER_PIXEL, "SamplesPerPixel"),
    (tags::ROWS_PER_STRIP, "RowsPerStrip"),
    (tags::STRIP_BYTE_COUNTS, "StripByteCounts"),
    (tags::PLANAR_CONFIGURATION, "PlanarConfiguration"),
    (tags::SOFTWARE, "Software"),
    (tags::PREDICTOR, "Predictor"),
    (tags::COLOR_MAP, "ColorMap"),
    (tags::TILE_WIDTH, "TileWidth"),
    (tags::TILE_LENGTH, "TileLength"),
    (tags::TILE_OFFSETS, "TileOffsets"),
    (tags::TILE_BYTE_COUNTS, "TileByteCounts"),
    (tags::INK_SET, "InkSet"),
    (tags::EXTRA_SAMPLES, "ExtraSamples"),
    (tags::SAMPLE_FORMAT, "SampleFormat"),
];

const FIELD_TYPE_NAMES: &[(u16, &str)] = &[
    (field_types::BYTE, "BYTE"),
    (field_types::ASCII, "ASCII"),
    (field_types::SHORT, "SHORT"),
    (field_types::LONG, "LONG"),
    (field_types::RATIONAL, "RATIONAL"),
    (field_types::SBYTE, "SBYTE"),
    (field_types::UNDEFINED, "UNDEFINED"),
    (field_types::SSHORT, "SSHORT"),
    (field_types::SLONG, "SLONG"),
    (field_types::SRATIONAL, "SRATIONAL"),
    (field_types::FLOAT, "FLOAT"),
    (field_types::DOUBLE, "DOUBLE"),
    (field_types::LONG8, "LONG8"),
    (field_types::SLONG8, "SLONG8"),
    (field_types::IFD8, "IFD8"),
];

const COMPRESSION_NAMES: &[(u16, &str)] = &[
    (compression::NONE, "None"),
    (compression::CCITT_RLE, "CCITT RLE"),
    (compression::CCITT_FAX3, "CCITT Group 3 Fax"),
    (compression::CCITT_FAX4, "CCITT Group 4 Fax"),
    (compression::LZW, "LZW"),
    (compression::JPEG_OLD, "Old JPEG"),
    (compression::JPEG, "JPEG"),
    (compression::DEFLATE, "Adobe Deflate"),
    (compression::DEFLATE_OLD, "Adobe Deflate"),
    (compression::ZSTD, "Zstandard"),
    (compression::ZSTD_LEGACY, "Zstandard"),
    (compression::PACKBITS, "PackBits"),
];

const PHOTOMETRIC_NAMES: &[(u16, &str)] = &[
    (photometric::WHITE_IS_ZERO, "WhiteIsZero"),
    (photometric::BLACK_IS_ZERO, "BlackIsZero"),
    (photometric::RGB, "RGB"),
    (photometric::PALETTE, "Palette"),
    (photometric::TRANSPARENCY_MASK, "TransparencyMask"),
    (photometric::CMYK, "CMYK"),
    (photometric::YCBCR, "YCbCr"),
    (photometric::CIELAB, "CIELAB"),
];

fn lookup(table: &[(u16, &'static str)], code: u64) -> &'static str {
    u16::try_from(code)
        .ok()
        .and_then(|code| table.iter().find(|(known, _)| *known == code))
        .map_or("Unknown", |&(_, name)| name)
}

/// Name of a tag, "Unknown" for tags the codec does not interpret
pub fn get_tag_name(tag: u16) -> &'static str {
    lookup(TAG_NAMES, tag as u64)
}

pub fn get_field_type_name(field_type: u16) -> &'static str {
    lookup(FIELD_TYPE_NAMES, field_type as u64)
}

pub fn get_compression_name(compression_code: u64) -> &'static str {
    lookup(COMPRESSION_NAMES, compression_code)
}

pub fn get_photometric_name(photometric_code: u64) -> &'static str {
    lookup(PHOTOMETRIC_NAMES, photometric_code)
}
