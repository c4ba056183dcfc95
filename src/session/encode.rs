//! Encode session: RGBA pixels in, uncompressed TIFF bytes out

use log::{debug, info};

use crate::io::{GrowableBuffer, MemoryWriter};
use crate::session::error::SessionError;
use crate::session::{error_channel, report, STREAM_NAME};
use crate::tiff::constants::{orientation, photometric, planar_config, tags};
use crate::tiff::{TiffEncoder, TiffResult};

/// Options for an encode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Rows per strip; `None` picks strips of about 8 KiB
    pub rows_per_strip: Option<u32>,
    /// Cap on the output buffer's allocation; exceeding it fails the write
    pub max_output_bytes: Option<usize>,
}

/// Progress of an encode session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodeState {
    Unopened,
    Opened,
    TagsSet,
    /// Writing the given row
    WritingRows(u32),
    Closed,
    Failed,
}

/// Encodes `width × height` RGBA pixels as a baseline TIFF
///
/// `pixels` must hold at least `width × height × 4` bytes; rows are taken
/// top to bottom without padding. Nothing is returned alongside an error:
/// the partial output is released.
pub fn encode(pixels: &[u8], width: u32, height: u32, options: &EncodeOptions) -> Result<Vec<u8>, SessionError> {
    let mut session = EncodeSession::new();
    session.run(pixels, width, height, options).map_err(report)
}

pub(crate) struct EncodeSession {
    state: EncodeState,
}

impl EncodeSession {
    pub fn new() -> Self {
        EncodeSession { state: EncodeState::Unopened }
    }

    #[cfg(test)]
    pub fn state(&self) -> EncodeState {
        self.state
    }

    fn advance(&mut self, next: EncodeState) {
        debug!("Encode session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn run(&mut self, pixels: &[u8], width: u32, height: u32,
               options: &EncodeOptions) -> Result<Vec<u8>, SessionError> {
        error_channel::install();
        error_channel::clear();

        let row_bytes = match Self::check_pixels(pixels, width, height) {
            Ok(row_bytes) => row_bytes,
            Err(message) => {
                self.advance(EncodeState::Failed);
                return Err(SessionError::Argument(message));
            }
        };

        let buffer = match options.max_output_bytes {
            Some(max) => GrowableBuffer::with_max_capacity(max),
            None => GrowableBuffer::new(),
        };
        let mut output = MemoryWriter::with_buffer(buffer);

        // On failure `output` is dropped here, releasing the partial file
        self.write_image(&mut output, pixels, width, height, row_bytes, options)?;

        self.advance(EncodeState::Closed);
        let bytes = output.into_inner();
        info!("Encoded {}x{} image into {} bytes", width, height, bytes.len());
        Ok(bytes)
    }

    /// Row size, once the buffer is known to hold the whole image
    fn check_pixels(pixels: &[u8], width: u32, height: u32) -> Result<usize, String> {
        if width == 0 || height == 0 {
            return Err(format!("Image dimensions must be positive, got {}x{}", width, height));
        }

        let row_bytes = (width as usize).checked_mul(4);
        let needed = row_bytes.and_then(|row| row.checked_mul(height as usize));
        match (row_bytes, needed) {
            (Some(row_bytes), Some(needed)) if pixels.len() >= needed => Ok(row_bytes),
            (_, needed) => Err(format!(
                "Pixel buffer holds {} bytes, a {}x{} RGBA image needs {}",
                pixels.len(), width, height,
                needed.map_or_else(|| "more than fits in memory".to_string(), |n| n.to_string()))),
        }
    }

    fn write_image(&mut self, output: &mut MemoryWriter, pixels: &[u8], width: u32, height: u32,
                   row_bytes: usize, options: &EncodeOptions) -> Result<(), SessionError> {
        let mut encoder = match TiffEncoder::client_open(STREAM_NAME, output) {
            Ok(encoder) => encoder,
            Err(e) => {
                let message = error_channel::failure_message(&e);
                self.advance(EncodeState::Failed);
                return Err(SessionError::Open(message));
            }
        };
        self.advance(EncodeState::Opened);

        if let Err(e) = describe(&mut encoder, width, height, options) {
            let message = error_channel::failure_message(&e);
            self.advance(EncodeState::Failed);
            release(encoder);
            return Err(SessionError::Encode(message));
        }
        self.advance(EncodeState::TagsSet);

        self.advance(EncodeState::WritingRows(0));
        for (row, data) in pixels.chunks_exact(row_bytes).take(height as usize).enumerate() {
            let row = row as u32;
            self.state = EncodeState::WritingRows(row);
            if let Err(e) = encoder.write_scanline(data, row) {
                let message = error_channel::failure_message(&e);
                self.advance(EncodeState::Failed);
                release(encoder);
                return Err(SessionError::Encode(message));
            }
        }

        if let Err(e) = encoder.close() {
            let message = error_channel::failure_message(&e);
            self.advance(EncodeState::Failed);
            return Err(SessionError::Encode(message));
        }

        Ok(())
    }
}

/// Sets the fields of an interleaved 8-bit RGBA image
fn describe(encoder: &mut TiffEncoder<'_>, width: u32, height: u32, options: &EncodeOptions) -> TiffResult<()> {
    encoder.set_field(tags::IMAGE_WIDTH, width)?;
    encoder.set_field(tags::IMAGE_LENGTH, height)?;
    encoder.set_field(tags::SAMPLES_PER_PIXEL, 4)?;
    encoder.set_field(tags::BITS_PER_SAMPLE, 8)?;
    encoder.set_field(tags::ORIENTATION, orientation::TOP_LEFT as u32)?;
    encoder.set_field(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY as u32)?;
    encoder.set_field(tags::PHOTOMETRIC_INTERPRETATION, photometric::RGB as u32)?;
    if let Some(rows) = options.rows_per_strip {
        encoder.set_field(tags::ROWS_PER_STRIP, rows)?;
    }
    Ok(())
}

/// Closes an encoder whose failure has already been captured
fn release(encoder: TiffEncoder<'_>) {
    if let Err(e) = encoder.close() {
        debug!("Close after failed encode: {}", e);
    }
}
