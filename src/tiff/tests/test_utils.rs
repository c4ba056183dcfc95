//! Builders for small in-memory TIFF streams used by the codec tests

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::tiff::constants::{field_types, tags};

/// Describes a single-image TIFF stream; [`TiffFixture::build`] lays it out
///
/// Strip or tile tables are generated from the chunks, so tests only list
/// the descriptive tags.
#[derive(Debug, Clone)]
pub struct TiffFixture {
    big_endian: bool,
    big_tiff: bool,
    tiled: bool,
    entries: Vec<(u16, u16, Vec<u64>)>,
    removed: Vec<u16>,
    chunks: Vec<Vec<u8>>,
}

impl TiffFixture {
    /// Starts a fixture with ImageWidth and ImageLength set
    pub fn new(width: u32, height: u32) -> Self {
        TiffFixture {
            big_endian: false,
            big_tiff: false,
            tiled: false,
            entries: vec![
                (tags::IMAGE_WIDTH, field_types::LONG, vec![width as u64]),
                (tags::IMAGE_LENGTH, field_types::LONG, vec![height as u64]),
            ],
            removed: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// 8-bit RGB with the given interleaved pixel data in one strip
    pub fn rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height)
            .short(tags::BITS_PER_SAMPLE, &[8, 8, 8])
            .short(tags::SAMPLES_PER_PIXEL, &[3])
            .short(tags::PHOTOMETRIC_INTERPRETATION, &[2])
            .strips(vec![pixels])
    }

    /// 8-bit BlackIsZero gray in one strip
    pub fn gray8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::new(width, height)
            .short(tags::BITS_PER_SAMPLE, &[8])
            .short(tags::PHOTOMETRIC_INTERPRETATION, &[1])
            .strips(vec![pixels])
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn big_tiff(mut self) -> Self {
        self.big_tiff = true;
        self
    }

    /// Adds (or replaces) a tag with SHORT values
    pub fn short(self, tag: u16, values: &[u16]) -> Self {
        let values = values.iter().map(|&v| v as u64).collect();
        self.tag(tag, field_types::SHORT, values)
    }

    /// Adds (or replaces) a tag with LONG values
    pub fn long(self, tag: u16, values: &[u32]) -> Self {
        let values = values.iter().map(|&v| v as u64).collect();
        self.tag(tag, field_types::LONG, values)
    }

    pub fn tag(mut self, tag: u16, field_type: u16, values: Vec<u64>) -> Self {
        self.entries.retain(|(existing, _, _)| *existing != tag);
        self.entries.push((tag, field_type, values));
        self
    }

    /// Leaves a tag out of the written directory, generated ones included
    pub fn without(mut self, tag: u16) -> Self {
        self.removed.push(tag);
        self
    }

    /// Image data as strips, in file order
    pub fn strips(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.tiled = false;
        self.chunks = chunks;
        self
    }

    /// Image data as tiles, in file order; TileWidth/TileLength are set by the caller
    pub fn tiles(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.tiled = true;
        self.chunks = chunks;
        self
    }

    fn put(&self, buffer: &mut Vec<u8>, value: u64, size: usize) {
        let mut bytes = [0u8; 8];
        match (self.big_endian, size) {
            (_, 1) => bytes[0] = value as u8,
            (false, 2) => LittleEndian::write_u16(&mut bytes, value as u16),
            (true, 2) => BigEndian::write_u16(&mut bytes, value as u16),
            (false, 4) => LittleEndian::write_u32(&mut bytes, value as u32),
            (true, 4) => BigEndian::write_u32(&mut bytes, value as u32),
            (false, _) => LittleEndian::write_u64(&mut bytes, value),
            (true, _) => BigEndian::write_u64(&mut bytes, value),
        }
        buffer.extend_from_slice(&bytes[..size]);
    }

    fn type_size(field_type: u16) -> usize {
        match field_type {
            field_types::BYTE | field_types::ASCII | field_types::UNDEFINED => 1,
            field_types::SHORT => 2,
            field_types::LONG => 4,
            _ => 8,
        }
    }

    /// Serializes the stream: header, chunks, out-of-line values, directory
    pub fn build(&self) -> Vec<u8> {
        let header_len: u64 = if self.big_tiff { 16 } else { 8 };
        let offset_size = if self.big_tiff { 8 } else { 4 };
        let mut body = Vec::new();

        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for chunk in &self.chunks {
            offsets.push(header_len + body.len() as u64);
            counts.push(chunk.len() as u64);
            body.extend_from_slice(chunk);
            if body.len() % 2 == 1 {
                body.push(0);
            }
        }

        let (offsets_tag, counts_tag) = if self.tiled {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        let table_type = if self.big_tiff { field_types::LONG8 } else { field_types::LONG };

        // Explicitly set tables win over the generated ones
        let mut entries = self.entries.clone();
        if !entries.iter().any(|(tag, _, _)| *tag == offsets_tag) {
            entries.push((offsets_tag, table_type, offsets));
        }
        if !entries.iter().any(|(tag, _, _)| *tag == counts_tag) {
            entries.push((counts_tag, table_type, counts));
        }
        entries.retain(|(tag, _, _)| !self.removed.contains(tag));
        entries.sort_by_key(|(tag, _, _)| *tag);

        let mut fields = Vec::with_capacity(entries.len());
        for (tag, field_type, values) in &entries {
            let size = Self::type_size(*field_type);
            let mut encoded = Vec::new();
            for &value in values {
                self.put(&mut encoded, value, size);
            }

            let field = if encoded.len() <= offset_size {
                encoded.resize(offset_size, 0);
                encoded
            } else {
                let offset = header_len + body.len() as u64;
                body.extend_from_slice(&encoded);
                if body.len() % 2 == 1 {
                    body.push(0);
                }
                let mut field = Vec::new();
                self.put(&mut field, offset, offset_size);
                field
            };
            fields.push((*tag, *field_type, values.len() as u64, field));
        }

        let ifd_offset = header_len + body.len() as u64;
        let mut output = Vec::new();
        output.extend_from_slice(if self.big_endian { b"MM" } else { b"II" });
        if self.big_tiff {
            self.put(&mut output, 43, 2);
            self.put(&mut output, 8, 2);
            self.put(&mut output, 0, 2);
            self.put(&mut output, ifd_offset, 8);
        } else {
            self.put(&mut output, 42, 2);
            self.put(&mut output, ifd_offset, 4);
        }
        output.extend_from_slice(&body);

        self.put(&mut output, fields.len() as u64, if self.big_tiff { 8 } else { 2 });
        for (tag, field_type, count, field) in fields {
            self.put(&mut output, tag as u64, 2);
            self.put(&mut output, field_type as u64, 2);
            self.put(&mut output, count, offset_size);
            output.extend_from_slice(&field);
        }
        self.put(&mut output, 0, offset_size);

        output
    }
}

/// Decodes a stream to RGBA with a top-left origin, panicking on failure
pub fn decode_rgba(bytes: &[u8]) -> (u32, u32, Vec<u8>) {
    use crate::io::MemoryReader;
    use crate::tiff::{Orientation, TiffDecoder};

    let mut input = MemoryReader::new(bytes);
    let mut decoder = TiffDecoder::client_open("test", &mut input).unwrap();
    let width = decoder.directory().width;
    let height = decoder.directory().height;
    let mut raster = vec![0u8; width as usize * height as usize * 4];
    decoder.read_rgba_image_oriented(width, height, &mut raster, Orientation::TopLeft).unwrap();
    decoder.close().unwrap();
    (width, height, raster)
}

/// Opaque RGBA expansion of 8-bit RGB pixels
pub fn opaque(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()
}
