//! Typed view of an image directory
//!
//! Pulls the fields the RGBA decode path needs out of a raw [`IFD`],
//! applying TIFF defaults and rejecting directories that cannot describe
//! an image.

use log::{debug, warn};

use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{compression, extra_samples, ink_set, orientation, photometric,
                             planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::utils::tag_utils;

/// How the image data is split into chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Horizontal strips spanning the full image width
    Strips { rows_per_strip: u32 },
    /// Rectangular tiles
    Tiles { tile_width: u32, tile_length: u32 },
}

/// Decoded fields of the first image directory
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u16,
    pub samples_per_pixel: u16,
    pub compression: u16,
    pub photometric: u16,
    pub planar_config: u16,
    pub predictor: u16,
    pub orientation: u16,
    pub sample_format: u16,
    pub ink_set: u16,
    pub extra_samples: Vec<u16>,
    /// 3 × 2^bits entries (all reds, then greens, then blues), palette images only
    pub color_map: Option<Vec<u16>>,
    pub layout: ChunkLayout,
    pub chunk_offsets: Vec<u64>,
    pub chunk_byte_counts: Vec<u64>,
}

impl ImageDirectory {
    /// Builds the typed view, reading out-of-line values from `stream`
    pub fn load(reader: &TiffReader, stream: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let width = required_u32(ifd, tags::IMAGE_WIDTH, "ImageWidth")?;
        let height = required_u32(ifd, tags::IMAGE_LENGTH, "ImageLength")?;

        let samples_per_pixel = optional_u16(ifd, tags::SAMPLES_PER_PIXEL, 1)?;
        let bits_per_sample = match ifd.get_entry(tags::BITS_PER_SAMPLE) {
            Some(_) => {
                let values = reader.read_tag_values(stream, ifd, tags::BITS_PER_SAMPLE)?;
                if values.windows(2).any(|pair| pair[0] != pair[1]) {
                    warn!("Mixed BitsPerSample values {:?}, using the first", values);
                }
                let first = values.first().copied().unwrap_or(1);
                u16::try_from(first).map_err(|_| invalid_value(tags::BITS_PER_SAMPLE, first))?
            }
            None => 1,
        };

        let photometric = match ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION) {
            Some(value) => u16::try_from(value).map_err(|_| invalid_value(tags::PHOTOMETRIC_INTERPRETATION, value))?,
            None => {
                let guess = if samples_per_pixel >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO };
                warn!("Photometric tag is missing, assuming {}", tag_utils::get_photometric_name(guess as u64));
                guess
            }
        };

        let extra_samples = if ifd.has_tag(tags::EXTRA_SAMPLES) {
            reader.read_tag_values(stream, ifd, tags::EXTRA_SAMPLES)?
                .into_iter()
                .map(|v| u16::try_from(v).unwrap_or(extra_samples::UNSPECIFIED))
                .collect()
        } else {
            Vec::new()
        };

        let color_map = if ifd.has_tag(tags::COLOR_MAP) {
            let values = reader.read_tag_values(stream, ifd, tags::COLOR_MAP)?;
            Some(values.into_iter().map(|v| v as u16).collect())
        } else {
            None
        };

        let (layout, offsets_tag, counts_tag, counts_name) = if ifd.has_tag(tags::TILE_OFFSETS) {
            let tile_width = required_u32(ifd, tags::TILE_WIDTH, "TileWidth")?;
            let tile_length = required_u32(ifd, tags::TILE_LENGTH, "TileLength")?;
            (ChunkLayout::Tiles { tile_width, tile_length },
             tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS, "TileByteCounts")
        } else if ifd.has_tag(tags::STRIP_OFFSETS) {
            let rows_per_strip = match ifd.get_tag_value(tags::ROWS_PER_STRIP) {
                Some(rows) => u32::try_from(rows).unwrap_or(u32::MAX).clamp(1, height.max(1)),
                None => height.max(1),
            };
            (ChunkLayout::Strips { rows_per_strip },
             tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS, "StripByteCounts")
        } else {
            return Err(TiffError::MissingRequiredField("StripOffsets"));
        };

        if !ifd.has_tag(counts_tag) {
            return Err(TiffError::MissingRequiredField(counts_name));
        }

        let chunk_offsets = reader.read_tag_values(stream, ifd, offsets_tag)?;
        let chunk_byte_counts = reader.read_tag_values(stream, ifd, counts_tag)?;

        let directory = ImageDirectory {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            compression: optional_u16(ifd, tags::COMPRESSION, compression::NONE)?,
            photometric,
            planar_config: optional_u16(ifd, tags::PLANAR_CONFIGURATION, planar_config::CHUNKY)?,
            predictor: optional_u16(ifd, tags::PREDICTOR, predictor::NONE)?,
            orientation: optional_u16(ifd, tags::ORIENTATION, orientation::TOP_LEFT)?,
            sample_format: optional_u16(ifd, tags::SAMPLE_FORMAT, sample_format::UNSIGNED)?,
            ink_set: optional_u16(ifd, tags::INK_SET, ink_set::CMYK)?,
            extra_samples,
            color_map,
            layout,
            chunk_offsets,
            chunk_byte_counts,
        };

        directory.validate_chunk_tables()?;
        debug!("Image directory: {}x{}, {} samples of {} bits, photometric {}, compression {}",
               directory.width, directory.height, directory.samples_per_pixel,
               directory.bits_per_sample, directory.photometric, directory.compression);

        Ok(directory)
    }

    /// Number of sample planes stored separately (1 for interleaved data)
    pub fn planes(&self) -> usize {
        if self.planar_config == planar_config::PLANAR {
            self.samples_per_pixel as usize
        } else {
            1
        }
    }

    /// Samples stored per pixel within one plane
    pub fn samples_per_plane_pixel(&self) -> usize {
        if self.planar_config == planar_config::PLANAR {
            1
        } else {
            self.samples_per_pixel as usize
        }
    }

    /// Bytes per row of `pixels` pixels within one plane, `None` on overflow
    pub fn row_bytes(&self, pixels: u32) -> Option<usize> {
        let bits = (pixels as u64)
            .checked_mul(self.samples_per_plane_pixel() as u64)?
            .checked_mul(self.bits_per_sample as u64)?;
        usize::try_from(bits.div_ceil(8)).ok()
    }

    /// Number of chunks covering one plane
    pub fn chunks_per_plane(&self) -> usize {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                (self.height as usize).div_ceil(rows_per_strip as usize)
            }
            ChunkLayout::Tiles { tile_width, tile_length } => {
                (self.width as usize).div_ceil(tile_width as usize)
                    .saturating_mul((self.height as usize).div_ceil(tile_length as usize))
            }
        }
    }

    /// Scalar value of a tag as the decoder sees it
    pub fn field(&self, tag: u16) -> Option<u32> {
        let value = match tag {
            tags::IMAGE_WIDTH => self.width,
            tags::IMAGE_LENGTH => self.height,
            tags::BITS_PER_SAMPLE => self.bits_per_sample as u32,
            tags::SAMPLES_PER_PIXEL => self.samples_per_pixel as u32,
            tags::COMPRESSION => self.compression as u32,
            tags::PHOTOMETRIC_INTERPRETATION => self.photometric as u32,
            tags::PLANAR_CONFIGURATION => self.planar_config as u32,
            tags::PREDICTOR => self.predictor as u32,
            tags::ORIENTATION => self.orientation as u32,
            tags::SAMPLE_FORMAT => self.sample_format as u32,
            tags::ROWS_PER_STRIP => match self.layout {
                ChunkLayout::Strips { rows_per_strip } => rows_per_strip,
                ChunkLayout::Tiles { .. } => return None,
            },
            tags::TILE_WIDTH => match self.layout {
                ChunkLayout::Tiles { tile_width, .. } => tile_width,
                ChunkLayout::Strips { .. } => return None,
            },
            tags::TILE_LENGTH => match self.layout {
                ChunkLayout::Tiles { tile_length, .. } => tile_length,
                ChunkLayout::Strips { .. } => return None,
            },
            _ => return None,
        };

        Some(value)
    }

    fn validate_chunk_tables(&self) -> TiffResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TiffError::GenericError(format!(
                "Cannot handle zero-sized image {}x{}", self.width, self.height)));
        }

        if self.samples_per_pixel == 0 {
            return Err(invalid_value(tags::SAMPLES_PER_PIXEL, 0));
        }

        if let ChunkLayout::Tiles { tile_width, tile_length } = self.layout {
            if tile_width == 0 || tile_length == 0 {
                return Err(TiffError::GenericError(format!(
                    "Invalid tile size {}x{}", tile_width, tile_length)));
            }
        }

        let expected = self.chunks_per_plane().saturating_mul(self.planes());
        if self.chunk_offsets.len() < expected || self.chunk_byte_counts.len() < expected {
            return Err(TiffError::GenericError(format!(
                "Too few strip/tile entries: {} offsets and {} byte counts for {} chunks",
                self.chunk_offsets.len(), self.chunk_byte_counts.len(), expected)));
        }

        Ok(())
    }
}

fn required_u32(ifd: &IFD, tag: u16, name: &'static str) -> TiffResult<u32> {
    let value = ifd.get_tag_value(tag)
        .ok_or(TiffError::MissingRequiredField(name))?;
    u32::try_from(value).map_err(|_| invalid_value(tag, value))
}

fn optional_u16(ifd: &IFD, tag: u16, default: u16) -> TiffResult<u16> {
    match ifd.get_tag_value(tag) {
        Some(value) => u16::try_from(value).map_err(|_| invalid_value(tag, value)),
        None => Ok(default),
    }
}

fn invalid_value(tag: u16, value: u64) -> TiffError {
    TiffError::GenericError(format!(
        "Invalid value {} for tag {} ({})", value, tag, tag_utils::get_tag_name(tag)))
}
