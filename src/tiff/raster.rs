//! Whole-image RGBA decoding
//!
//! Reads every strip or tile of the first directory, undoes compression and
//! horizontal prediction, and converts the samples to 8-bit RGBA in the
//! requested orientation.

use log::{debug, warn};
use std::io::SeekFrom;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{extra_samples, ink_set, orientation, photometric, planar_config,
                             predictor, sample_format};
use crate::tiff::directory::{ChunkLayout, ImageDirectory};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::validation;

/// Where row 0 of the output raster sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Row 0 is the top of the image
    TopLeft,
    /// Row 0 is the bottom of the image
    BottomLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alpha {
    None,
    Associated,
    Unassociated,
}

#[derive(Debug, Clone)]
enum ColorModel {
    Gray { invert: bool },
    Palette { map: Vec<[u8; 3]> },
    Rgb,
    Cmyk,
}

/// Decodes the image described by one directory into an RGBA raster
pub(crate) struct RasterDecoder<'a> {
    directory: &'a ImageDirectory,
    byte_order: ByteOrder,
    handler: Box<dyn CompressionHandler>,
    model: ColorModel,
    alpha: Alpha,
    /// Upper bound for any single working buffer
    max_alloc: usize,
}

impl<'a> RasterDecoder<'a> {
    /// Checks that the image can be converted to RGBA and prepares the decoder
    pub fn new(directory: &'a ImageDirectory, byte_order: ByteOrder, max_alloc: usize) -> TiffResult<Self> {
        let bits = directory.bits_per_sample;
        let spp = directory.samples_per_pixel;

        if directory.sample_format == sample_format::IEEEFP {
            return Err(TiffError::UnsupportedImage("with IEEE floating-point samples".to_string()));
        }
        if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
            return Err(TiffError::UnsupportedImage(format!("with {}-bit samples", bits)));
        }
        if directory.planar_config != planar_config::CHUNKY && directory.planar_config != planar_config::PLANAR {
            return Err(TiffError::UnsupportedImage(format!(
                "with PlanarConfiguration={}", directory.planar_config)));
        }
        match directory.predictor {
            predictor::NONE => {}
            predictor::HORIZONTAL_DIFFERENCING if bits == 8 || bits == 16 => {}
            predictor::HORIZONTAL_DIFFERENCING => {
                return Err(TiffError::GenericError(format!(
                    "Horizontal differencing Predictor not supported with {}-bit samples", bits)));
            }
            other => {
                return Err(TiffError::UnsupportedImage(format!("with Predictor={}", other)));
            }
        }

        let handler = CompressionFactory::create_handler(directory.compression as u64)?;

        let model = match directory.photometric {
            photometric::WHITE_IS_ZERO | photometric::BLACK_IS_ZERO => {
                if directory.planar_config == planar_config::CHUNKY && spp != 1 && bits < 8 {
                    return Err(TiffError::UnsupportedImage(format!(
                        "with contiguous data, PhotometricInterpretation={}, Samples/pixel={} and Bits/Sample={}",
                        directory.photometric, spp, bits)));
                }
                ColorModel::Gray { invert: directory.photometric == photometric::WHITE_IS_ZERO }
            }
            photometric::PALETTE => {
                if spp != 1 || bits > 8 {
                    return Err(TiffError::UnsupportedImage(format!(
                        "with Palette, Samples/pixel={} and Bits/Sample={}", spp, bits)));
                }
                ColorModel::Palette { map: build_palette(directory)? }
            }
            photometric::RGB => {
                if spp < 3 || bits < 8 {
                    return Err(TiffError::UnsupportedImage(format!(
                        "with RGB, Samples/pixel={} and Bits/Sample={}", spp, bits)));
                }
                ColorModel::Rgb
            }
            photometric::CMYK => {
                if directory.ink_set != ink_set::CMYK {
                    return Err(TiffError::UnsupportedImage(format!("with InkSet={}", directory.ink_set)));
                }
                if spp < 4 || bits != 8 {
                    return Err(TiffError::UnsupportedImage(format!(
                        "with separated data, Samples/pixel={} and Bits/Sample={}", spp, bits)));
                }
                ColorModel::Cmyk
            }
            other => {
                return Err(TiffError::UnsupportedImage(format!("with PhotometricInterpretation={}", other)));
            }
        };

        let alpha = match model {
            ColorModel::Gray { .. } if spp >= 2 => alpha_mode(directory, spp > 3),
            ColorModel::Rgb if spp >= 4 => alpha_mode(directory, spp > 3),
            _ => Alpha::None,
        };

        if let ChunkLayout::Tiles { tile_width, .. } = directory.layout {
            let tile_bits = tile_width as u64 * directory.samples_per_plane_pixel() as u64 * bits as u64;
            if tile_bits % 8 != 0 {
                return Err(TiffError::UnsupportedImage(format!(
                    "with tile width {} not aligned to whole bytes", tile_width)));
            }
        }

        debug!("RGBA conversion: {:?}, alpha {:?}, {} compression",
               model, alpha, handler.name());

        Ok(RasterDecoder {
            directory,
            byte_order,
            handler,
            model,
            alpha,
            max_alloc,
        })
    }

    /// Decodes the whole image into `raster` (width × height × 4 bytes, RGBA)
    pub fn decode(&self, stream: &mut dyn SeekableReader, raster: &mut [u8], origin: Orientation) -> TiffResult<()> {
        let dir = self.directory;
        let width = dir.width as usize;
        let height = dir.height as usize;

        let raster_len = width.checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or(TiffError::OutOfMemory(usize::MAX))?;
        if raster.len() < raster_len {
            return Err(TiffError::GenericError(format!(
                "Raster of {} bytes is too small for a {}x{} image", raster.len(), width, height)));
        }

        let planes = self.read_planes(stream)?;
        let row_bytes = self.row_bytes(dir.width)?;
        let (flip_h, flip_v) = flips(dir.orientation, origin);

        for y in 0..height {
            let out_y = if flip_v { height - 1 - y } else { y };
            let rows: Vec<&[u8]> = planes.iter()
                .map(|plane| &plane[y * row_bytes..(y + 1) * row_bytes])
                .collect();

            for x in 0..width {
                let out_x = if flip_h { width - 1 - x } else { x };
                let pixel = self.convert_pixel(&rows, x);
                let at = (out_y * width + out_x) * 4;
                raster[at..at + 4].copy_from_slice(&pixel);
            }
        }

        Ok(())
    }

    fn row_bytes(&self, pixels: u32) -> TiffResult<usize> {
        self.directory.row_bytes(pixels)
            .ok_or(TiffError::OutOfMemory(usize::MAX))
    }

    fn allocate(&self, len: usize) -> TiffResult<Vec<u8>> {
        if len > self.max_alloc {
            return Err(TiffError::GenericError(format!(
                "Memory allocation of {} bytes is beyond the {} byte limit", len, self.max_alloc)));
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| TiffError::OutOfMemory(len))?;
        buffer.resize(len, 0);
        Ok(buffer)
    }

    /// Reads every chunk into one packed buffer per sample plane
    fn read_planes(&self, stream: &mut dyn SeekableReader) -> TiffResult<Vec<Vec<u8>>> {
        let dir = self.directory;
        let file_size = validation::get_file_size(stream)?;
        let row_bytes = self.row_bytes(dir.width)?;
        let height = dir.height as usize;
        let plane_len = row_bytes.checked_mul(height)
            .ok_or(TiffError::OutOfMemory(usize::MAX))?;
        let chunks_per_plane = dir.chunks_per_plane();

        let mut planes = Vec::with_capacity(dir.planes());
        for plane in 0..dir.planes() {
            let mut buffer = self.allocate(plane_len)?;
            let first_chunk = plane * chunks_per_plane;

            match dir.layout {
                ChunkLayout::Strips { rows_per_strip } => {
                    let rows_per_strip = rows_per_strip as usize;
                    for strip in 0..chunks_per_plane {
                        let first_row = strip * rows_per_strip;
                        let rows = rows_per_strip.min(height - first_row);
                        let expected = rows * row_bytes;

                        let mut data = self.read_chunk(stream, first_chunk + strip, expected, file_size)?;
                        self.undo_predictor(&mut data[..expected], row_bytes);

                        let start = first_row * row_bytes;
                        buffer[start..start + expected].copy_from_slice(&data[..expected]);
                    }
                }
                ChunkLayout::Tiles { tile_width, tile_length } => {
                    let tile_row_bytes = self.row_bytes(tile_width)?;
                    let expected = tile_row_bytes.checked_mul(tile_length as usize)
                        .ok_or(TiffError::OutOfMemory(usize::MAX))?;
                    if expected > self.max_alloc {
                        return Err(TiffError::GenericError(format!(
                            "Tile of {} bytes is beyond the {} byte limit", expected, self.max_alloc)));
                    }

                    let tiles_across = (dir.width as usize).div_ceil(tile_width as usize);
                    let bits_per_pixel = dir.samples_per_plane_pixel() * dir.bits_per_sample as usize;

                    for tile in 0..chunks_per_plane {
                        let x0 = (tile % tiles_across) * tile_width as usize;
                        let y0 = (tile / tiles_across) * tile_length as usize;

                        let mut data = self.read_chunk(stream, first_chunk + tile, expected, file_size)?;
                        self.undo_predictor(&mut data[..expected], tile_row_bytes);

                        let visible_width = (tile_width as usize).min(dir.width as usize - x0);
                        let copy_len = (visible_width * bits_per_pixel).div_ceil(8);
                        let column_offset = x0 * bits_per_pixel / 8;
                        let visible_rows = (tile_length as usize).min(height - y0);

                        for row in 0..visible_rows {
                            let src = &data[row * tile_row_bytes..row * tile_row_bytes + copy_len];
                            let dst = (y0 + row) * row_bytes + column_offset;
                            buffer[dst..dst + copy_len].copy_from_slice(src);
                        }
                    }
                }
            }

            planes.push(buffer);
        }

        Ok(planes)
    }

    /// Reads and decompresses one strip or tile, checking it against the stream first
    fn read_chunk(&self, stream: &mut dyn SeekableReader, index: usize, expected: usize, file_size: u64) -> TiffResult<Vec<u8>> {
        let dir = self.directory;
        let offset = dir.chunk_offsets[index];
        let byte_count = dir.chunk_byte_counts[index];
        validation::validate_chunk(index, offset, byte_count, file_size)?;

        stream.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0u8; byte_count as usize];
        stream.read_exact(&mut raw)?;

        let data = self.handler.decompress(&raw, expected)?;
        if data.len() < expected {
            return Err(TiffError::GenericError(format!(
                "Read error on strip/tile {}; got {} bytes, expected {}", index, data.len(), expected)));
        }

        Ok(data)
    }

    fn undo_predictor(&self, data: &mut [u8], row_bytes: usize) {
        if self.directory.predictor != predictor::HORIZONTAL_DIFFERENCING || row_bytes == 0 {
            return;
        }

        let stride = self.directory.samples_per_plane_pixel();
        for row in data.chunks_mut(row_bytes) {
            if self.directory.bits_per_sample == 8 {
                for i in stride..row.len() {
                    row[i] = row[i].wrapping_add(row[i - stride]);
                }
            } else {
                for i in stride..row.len() / 2 {
                    let previous = self.byte_order.u16_from(&row[(i - stride) * 2..]);
                    let current = self.byte_order.u16_from(&row[i * 2..]);
                    self.byte_order.write_u16_into(current.wrapping_add(previous), &mut row[i * 2..i * 2 + 2]);
                }
            }
        }
    }

    /// Raw value of sample `channel` of pixel `x`
    fn sample(&self, rows: &[&[u8]], x: usize, channel: usize) -> u16 {
        let dir = self.directory;
        let (row, index) = if dir.planar_config == planar_config::PLANAR {
            (rows[channel], x)
        } else {
            (rows[0], x * dir.samples_per_pixel as usize + channel)
        };

        match dir.bits_per_sample {
            8 => row[index] as u16,
            16 => self.byte_order.u16_from(&row[index * 2..]),
            bits => {
                let bits = bits as usize;
                let bit = index * bits;
                let shift = 8 - bits - bit % 8;
                ((row[bit / 8] >> shift) & ((1u8 << bits) - 1)) as u16
            }
        }
    }

    fn sample8(&self, rows: &[&[u8]], x: usize, channel: usize) -> u8 {
        scale_to_8bit(self.sample(rows, x, channel), self.directory.bits_per_sample)
    }

    fn convert_pixel(&self, rows: &[&[u8]], x: usize) -> [u8; 4] {
        match &self.model {
            ColorModel::Gray { invert } => {
                let mut gray = self.sample8(rows, x, 0);
                if *invert {
                    gray = 255 - gray;
                }
                let alpha = match self.alpha {
                    Alpha::None => 255,
                    _ => self.sample8(rows, x, 1),
                };
                [gray, gray, gray, alpha]
            }
            ColorModel::Palette { map } => {
                let [r, g, b] = map[self.sample(rows, x, 0) as usize];
                [r, g, b, 255]
            }
            ColorModel::Rgb => {
                let mut rgb = [self.sample8(rows, x, 0), self.sample8(rows, x, 1), self.sample8(rows, x, 2)];
                let alpha = match self.alpha {
                    Alpha::None => 255,
                    Alpha::Associated => self.sample8(rows, x, 3),
                    Alpha::Unassociated => {
                        let a = self.sample8(rows, x, 3);
                        for value in rgb.iter_mut() {
                            *value = premultiply(*value, a);
                        }
                        a
                    }
                };
                [rgb[0], rgb[1], rgb[2], alpha]
            }
            ColorModel::Cmyk => {
                let k = 255 - self.sample8(rows, x, 3) as u32;
                let channel = |c: usize| ((k * (255 - self.sample8(rows, x, c) as u32)) / 255) as u8;
                [channel(0), channel(1), channel(2), 255]
            }
        }
    }
}

/// Meaning of the first extra sample; with `unspecified_is_alpha`, an
/// unspecified extra sample (or a missing ExtraSamples tag) counts as associated alpha
fn alpha_mode(directory: &ImageDirectory, unspecified_is_alpha: bool) -> Alpha {
    match directory.extra_samples.first().copied().unwrap_or(extra_samples::UNSPECIFIED) {
        extra_samples::ASSOCIATED_ALPHA => Alpha::Associated,
        extra_samples::UNASSOCIATED_ALPHA => Alpha::Unassociated,
        extra_samples::UNSPECIFIED if unspecified_is_alpha => Alpha::Associated,
        _ => Alpha::None,
    }
}

fn build_palette(directory: &ImageDirectory) -> TiffResult<Vec<[u8; 3]>> {
    let entries = 1usize << directory.bits_per_sample;
    let color_map = directory.color_map.as_ref()
        .ok_or(TiffError::MissingRequiredField("Colormap"))?;
    if color_map.len() < entries * 3 {
        return Err(TiffError::GenericError(format!(
            "Colormap has {} values, {} needed for {}-bit samples",
            color_map.len(), entries * 3, directory.bits_per_sample)));
    }

    let (reds, rest) = color_map.split_at(entries);
    let (greens, blues) = rest.split_at(entries);
    let eight_bit = color_map[..entries * 3].iter().all(|&v| v < 256);
    if eight_bit {
        warn!("Assuming 8-bit colormap");
    }

    let convert = |v: u16| -> u8 {
        if eight_bit {
            v as u8
        } else {
            (v as u32 * 255 / 65535) as u8
        }
    };

    Ok((0..entries)
        .map(|i| [convert(reds[i]), convert(greens[i]), convert(blues[i])])
        .collect())
}

fn scale_to_8bit(value: u16, bits: u16) -> u8 {
    match bits {
        8 => value as u8,
        16 => ((value as u32 * 255 + 32767) / 65535) as u8,
        bits => {
            let max = (1u32 << bits) - 1;
            (value as u32 * 255 / max) as u8
        }
    }
}

fn premultiply(value: u8, alpha: u8) -> u8 {
    ((value as u32 * alpha as u32 + 127) / 255) as u8
}

/// Horizontal and vertical flips taking a file orientation to the requested origin
///
/// Orientations 5-8 are handled like 1-4, without transposing.
fn flips(file_orientation: u16, origin: Orientation) -> (bool, bool) {
    let (flip_h, flip_v) = match file_orientation {
        orientation::TOP_LEFT | orientation::LEFT_TOP => (false, false),
        orientation::TOP_RIGHT | orientation::RIGHT_TOP => (true, false),
        orientation::BOTTOM_RIGHT | orientation::RIGHT_BOTTOM => (true, true),
        orientation::BOTTOM_LEFT | orientation::LEFT_BOTTOM => (false, true),
        other => {
            warn!("Unknown orientation {}, assuming top-left", other);
            (false, false)
        }
    };

    match origin {
        Orientation::TopLeft => (flip_h, flip_v),
        Orientation::BottomLeft => (flip_h, !flip_v),
    }
}
