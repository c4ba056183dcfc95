//! Open codec handles over client streams
//!
//! [`TiffDecoder`] and [`TiffEncoder`] are the codec's public face: they are
//! opened against a [`ClientIo`], and every failing public call reports its
//! error through [`diagnostics`](crate::tiff::diagnostics) before returning it.
//! Each handle closes its stream exactly once, on `close` or on drop.

use log::{debug, info, warn};
use std::io::Write;

use crate::io::client_io::{ClientIo, ClientStream};
use crate::tiff::constants::{compression, extra_samples, planar_config, tags};
use crate::tiff::diagnostics::reported;
use crate::tiff::directory::ImageDirectory;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{Orientation, RasterDecoder};
use crate::tiff::reader::TiffReader;
use crate::tiff::writer::{self, DirectoryWriter, ImageFields, StripLayout};
use crate::utils::tag_utils;

/// Default cap on any single working buffer while decoding
pub const DEFAULT_MAX_SINGLE_ALLOC: usize = 2 << 30;

/// Largest SamplesPerPixel the encoder accepts
const MAX_WRITE_SAMPLES: u32 = 16;

/// A TIFF stream opened for reading
pub struct TiffDecoder<'a> {
    name: String,
    stream: ClientStream<'a>,
    reader: TiffReader,
    directory: ImageDirectory,
    max_single_alloc: usize,
    closed: bool,
}

impl<'a> TiffDecoder<'a> {
    /// Parses the header and first directory of the stream
    ///
    /// Fails if the stream is not a TIFF or the directory lacks a field
    /// every image needs (dimensions, strip or tile tables).
    pub fn client_open(name: &str, io: &'a mut dyn ClientIo) -> TiffResult<Self> {
        reported(name, Self::open(name, io))
    }

    fn open(name: &str, io: &'a mut dyn ClientIo) -> TiffResult<Self> {
        let mut stream = ClientStream::new(io);
        debug!("Opening {} for reading ({} bytes)", name, stream.size());

        let opened = Self::read_directory(&mut stream);
        match opened {
            Ok((reader, directory)) => Ok(TiffDecoder {
                name: name.to_string(),
                stream,
                reader,
                directory,
                max_single_alloc: DEFAULT_MAX_SINGLE_ALLOC,
                closed: false,
            }),
            Err(e) => {
                if let Err(close_error) = stream.close() {
                    warn!("{}: close after failed open: {}", name, close_error);
                }
                Err(e)
            }
        }
    }

    fn read_directory(stream: &mut ClientStream<'_>) -> TiffResult<(TiffReader, ImageDirectory)> {
        let mut reader = TiffReader::new();
        let tiff = reader.read(stream)?;
        let ifd = tiff.main_ifd()
            .ok_or_else(|| TiffError::GenericError("No image directory".to_string()))?;
        let directory = ImageDirectory::load(&reader, stream, ifd)?;
        Ok((reader, directory))
    }

    /// Name the stream was opened under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The typed view of the first directory
    pub fn directory(&self) -> &ImageDirectory {
        &self.directory
    }

    /// Limits the size of any single buffer the decoder allocates
    pub fn set_max_single_alloc(&mut self, bytes: usize) {
        self.max_single_alloc = bytes;
    }

    /// Scalar value of a tag, with TIFF defaults applied
    pub fn get_field(&self, tag: u16) -> TiffResult<u32> {
        let value = self.directory.field(tag).ok_or(TiffError::TagNotFound(tag));
        reported(&self.name, value)
    }

    /// Decodes the whole image as 8-bit RGBA
    ///
    /// `raster` must hold `width × height × 4` bytes, and the dimensions must
    /// match the image. With [`Orientation::TopLeft`] row 0 of the raster is
    /// the top of the image whatever the file's own orientation.
    pub fn read_rgba_image_oriented(&mut self, width: u32, height: u32, raster: &mut [u8],
                                    orientation: Orientation) -> TiffResult<()> {
        let result = self.read_rgba(width, height, raster, orientation);
        reported(&self.name, result)
    }

    fn read_rgba(&mut self, width: u32, height: u32, raster: &mut [u8], orientation: Orientation) -> TiffResult<()> {
        if width != self.directory.width || height != self.directory.height {
            return Err(TiffError::GenericError(format!(
                "Raster size {}x{} does not match image size {}x{}",
                width, height, self.directory.width, self.directory.height)));
        }

        let byte_order = self.reader.byte_order()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))?;
        let decoder = RasterDecoder::new(&self.directory, byte_order, self.max_single_alloc)?;
        decoder.decode(&mut self.stream, raster, orientation)?;

        info!("{}: decoded {}x{} image to RGBA", self.name, width, height);
        Ok(())
    }

    /// Releases the stream
    pub fn close(mut self) -> TiffResult<()> {
        let result = self.release().map_err(TiffError::from);
        reported(&self.name, result)
    }

    fn release(&mut self) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close()
    }
}

impl Drop for TiffDecoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}: error closing stream: {}", self.name, e);
        }
    }
}

/// A TIFF stream opened for writing
///
/// Fields are set first, then rows are written top to bottom with
/// [`write_scanline`](Self::write_scanline), then [`close`](Self::close)
/// writes the directory.
pub struct TiffEncoder<'a> {
    name: String,
    stream: ClientStream<'a>,
    fields: ImageFields,
    layout: Option<StripLayout>,
    rows_written: u32,
    failed: bool,
    closed: bool,
}

impl<'a> TiffEncoder<'a> {
    /// Opens an empty stream for writing a single image
    pub fn client_open(name: &str, io: &'a mut dyn ClientIo) -> TiffResult<Self> {
        let mut stream = ClientStream::new(io);
        let result = if stream.size() != 0 {
            let size = stream.size();
            if let Err(close_error) = stream.close() {
                warn!("{}: close after failed open: {}", name, close_error);
            }
            Err(TiffError::GenericError(format!(
                "Cannot write to a stream that already holds {} bytes", size)))
        } else {
            debug!("Opening {} for writing", name);
            Ok(TiffEncoder {
                name: name.to_string(),
                stream,
                fields: ImageFields::default(),
                layout: None,
                rows_written: 0,
                failed: false,
                closed: false,
            })
        };

        reported(name, result)
    }

    /// Sets a field of the image; only allowed before the first scanline
    pub fn set_field(&mut self, tag: u16, value: u32) -> TiffResult<()> {
        let result = self.apply_field(tag, value);
        reported(&self.name, result)
    }

    fn apply_field(&mut self, tag: u16, value: u32) -> TiffResult<()> {
        if self.layout.is_some() {
            return Err(TiffError::GenericError(format!(
                "Cannot modify tag \"{}\" while writing", tag_utils::get_tag_name(tag))));
        }

        let bad_value = || TiffError::GenericError(format!(
            "Bad value {} for \"{}\" tag", value, tag_utils::get_tag_name(tag)));
        let short = || u16::try_from(value).map_err(|_| bad_value());

        match tag {
            tags::IMAGE_WIDTH => self.fields.width = Some(value),
            tags::IMAGE_LENGTH => self.fields.height = Some(value),
            tags::BITS_PER_SAMPLE => match value {
                8 | 16 => self.fields.bits_per_sample = value as u16,
                _ => return Err(TiffError::UnsupportedImage(format!("with {}-bit samples for writing", value))),
            },
            tags::SAMPLES_PER_PIXEL => {
                if value == 0 || value > MAX_WRITE_SAMPLES {
                    return Err(bad_value());
                }
                self.fields.samples_per_pixel = value as u16;
            }
            tags::COMPRESSION => {
                if value != compression::NONE as u32 {
                    return Err(TiffError::UnsupportedCompression(value as u64));
                }
            }
            tags::PHOTOMETRIC_INTERPRETATION => {
                if !writer::is_writable_photometric(value) {
                    return Err(bad_value());
                }
                self.fields.photometric = Some(short()?);
            }
            tags::ORIENTATION => {
                if !(1..=8).contains(&value) {
                    return Err(bad_value());
                }
                self.fields.orientation = value as u16;
            }
            tags::PLANAR_CONFIGURATION => match short()? {
                planar_config::CHUNKY => self.fields.planar_config = planar_config::CHUNKY,
                planar_config::PLANAR => {
                    return Err(TiffError::UnsupportedImage("with separate planes for writing".to_string()));
                }
                _ => return Err(bad_value()),
            },
            tags::ROWS_PER_STRIP => {
                if value == 0 {
                    return Err(bad_value());
                }
                self.fields.rows_per_strip = Some(value);
            }
            tags::EXTRA_SAMPLES => {
                if value > extra_samples::UNASSOCIATED_ALPHA as u32 {
                    return Err(bad_value());
                }
                self.fields.extra_samples = Some(value as u16);
            }
            _ => {
                return Err(TiffError::GenericError(format!(
                    "Tag {} ({}) is not supported for writing", tag, tag_utils::get_tag_name(tag))));
            }
        }

        debug!("{}: set {} = {}", self.name, tag_utils::get_tag_name(tag), value);
        Ok(())
    }

    /// Size in bytes of one row of the image as currently described
    pub fn scanline_size(&self) -> Option<usize> {
        let width = self.fields.width? as u64;
        let bits = width * self.fields.samples_per_pixel as u64 * self.fields.bits_per_sample as u64;
        usize::try_from(bits.div_ceil(8)).ok()
    }

    /// Appends image row `row`; rows must arrive in order starting at 0
    ///
    /// The first call fixes the layout and writes the header. After any
    /// failure the encoder refuses further rows.
    pub fn write_scanline(&mut self, data: &[u8], row: u32) -> TiffResult<()> {
        let result = if self.failed {
            Err(TiffError::GenericError("Cannot write after a previous write failed".to_string()))
        } else {
            let result = self.append_row(data, row);
            if result.is_err() {
                self.failed = true;
            }
            result
        };

        reported(&self.name, result)
    }

    fn append_row(&mut self, data: &[u8], row: u32) -> TiffResult<()> {
        if self.layout.is_none() {
            let layout = DirectoryWriter::plan(&self.fields)?;
            DirectoryWriter::write_header(&mut self.stream, &layout)?;
            debug!("{}: writing {}x{} image, {} bytes per row",
                   self.name, layout.width, layout.height, layout.row_bytes);
            self.layout = Some(layout);
        }

        let layout = self.layout.as_ref()
            .ok_or_else(|| TiffError::GenericError("Layout not planned".to_string()))?;

        if row >= layout.height {
            return Err(TiffError::GenericError(format!(
                "Can not write scanline {}, image is only {} rows", row, layout.height)));
        }
        if row != self.rows_written {
            return Err(TiffError::GenericError(format!(
                "Scanline {} written out of order, expected {}", row, self.rows_written)));
        }
        if data.len() < layout.row_bytes {
            return Err(TiffError::GenericError(format!(
                "Scanline {} has {} bytes, {} needed", row, data.len(), layout.row_bytes)));
        }

        self.stream.write_all(&data[..layout.row_bytes])?;
        self.rows_written += 1;
        Ok(())
    }

    /// Writes the directory (unless a write failed) and releases the stream
    ///
    /// A failed encoder writes nothing more and closes cleanly; its error
    /// was already returned by the failing call.
    pub fn close(mut self) -> TiffResult<()> {
        let result = self.finish();
        reported(&self.name, result)
    }

    fn finish(&mut self) -> TiffResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let written = if self.failed {
            debug!("{}: closing failed encoder without writing a directory", self.name);
            Ok(())
        } else {
            self.write_directory()
        };
        let released = self.stream.close().map_err(TiffError::from);

        written.and(released)
    }

    fn write_directory(&mut self) -> TiffResult<()> {
        let layout = match &self.layout {
            Some(layout) => layout,
            None => {
                return Err(TiffError::GenericError(format!(
                    "{}: no image data was written", self.name)));
            }
        };

        if self.rows_written < layout.height {
            return Err(TiffError::GenericError(format!(
                "Image is incomplete: {} of {} rows written", self.rows_written, layout.height)));
        }

        DirectoryWriter::write_directory(&mut self.stream, layout)?;
        info!("{}: wrote {}x{} image in {} strips",
              self.name, layout.width, layout.height, layout.strip_count);
        Ok(())
    }
}

impl Drop for TiffEncoder<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("{}: error closing encoder: {}", self.name, e);
        }
    }
}
