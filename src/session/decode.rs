//! Decode session: TIFF bytes in, top-left RGBA raster out

use log::{debug, info};

use crate::io::MemoryReader;
use crate::session::error::SessionError;
use crate::session::{error_channel, report, STREAM_NAME};
use crate::tiff::constants::tags;
use crate::tiff::{Orientation, TiffDecoder};

/// Default cap on the decoded raster: 1 GiB
pub const DEFAULT_MAX_RASTER_BYTES: usize = 1 << 30;

/// Resource limits for a decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest RGBA raster (`width × height × 4`) the session will allocate
    pub max_raster_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits { max_raster_bytes: DEFAULT_MAX_RASTER_BYTES }
    }
}

/// A decoded image: 8-bit RGBA, row-major, top-left origin, no row padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Progress of a decode session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeState {
    Unopened,
    Opened,
    TagsRead,
    Decoded,
    Closed,
    Failed,
}

/// Decodes the first image of a TIFF held in memory
///
/// The codec is closed before this returns, on every path that opened it.
pub fn decode(bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, SessionError> {
    let mut session = DecodeSession::new();
    session.run(bytes, limits).map_err(report)
}

pub(crate) struct DecodeSession {
    state: DecodeState,
}

impl DecodeSession {
    pub fn new() -> Self {
        DecodeSession { state: DecodeState::Unopened }
    }

    #[cfg(test)]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    fn advance(&mut self, next: DecodeState) {
        debug!("Decode session: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn run(&mut self, bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, SessionError> {
        error_channel::install();
        error_channel::clear();

        let mut input = MemoryReader::new(bytes);
        let mut decoder = match TiffDecoder::client_open(STREAM_NAME, &mut input) {
            Ok(decoder) => decoder,
            Err(e) => {
                let message = error_channel::failure_message(&e);
                self.advance(DecodeState::Failed);
                return Err(SessionError::Open(message));
            }
        };
        self.advance(DecodeState::Opened);

        // Sample planes can be up to twice the raster (16-bit RGBA)
        decoder.set_max_single_alloc(limits.max_raster_bytes.saturating_mul(2));

        let image = self.read_image(&mut decoder, limits);
        let closed = decoder.close();

        match image {
            Ok(image) => {
                if let Err(e) = closed {
                    let message = error_channel::failure_message(&e);
                    self.advance(DecodeState::Failed);
                    return Err(SessionError::Decode(message));
                }
                self.advance(DecodeState::Closed);
                info!("Decoded {}x{} image from {} bytes", image.width, image.height, bytes.len());
                Ok(image)
            }
            Err(err) => {
                if let Err(e) = closed {
                    debug!("Close after failed decode: {}", e);
                }
                Err(err)
            }
        }
    }

    fn read_image(&mut self, decoder: &mut TiffDecoder<'_>, limits: &DecodeLimits) -> Result<DecodedImage, SessionError> {
        let fields = decoder.get_field(tags::IMAGE_WIDTH)
            .and_then(|width| Ok((width, decoder.get_field(tags::IMAGE_LENGTH)?)));
        let (width, height) = match fields {
            Ok(fields) => fields,
            Err(e) => return Err(self.fail(error_channel::failure_message(&e))),
        };
        self.advance(DecodeState::TagsRead);

        let mut raster = match self.allocate_raster(width, height, limits) {
            Ok(raster) => raster,
            Err(message) => {
                error_channel::set(&message);
                return Err(self.fail(message));
            }
        };

        if let Err(e) = decoder.read_rgba_image_oriented(width, height, &mut raster, Orientation::TopLeft) {
            return Err(self.fail(error_channel::failure_message(&e)));
        }
        self.advance(DecodeState::Decoded);

        Ok(DecodedImage { width, height, data: raster })
    }

    fn fail(&mut self, message: String) -> SessionError {
        self.advance(DecodeState::Failed);
        SessionError::Decode(message)
    }

    fn allocate_raster(&self, width: u32, height: u32, limits: &DecodeLimits) -> Result<Vec<u8>, String> {
        let len = (width as usize).checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .filter(|&len| len <= limits.max_raster_bytes)
            .ok_or_else(|| format!("Raster of {}x{} pixels exceeds the {} byte limit",
                                   width, height, limits.max_raster_bytes))?;

        let mut raster = Vec::new();
        raster.try_reserve_exact(len)
            .map_err(|_| format!("Out of memory allocating {} bytes for the raster", len))?;
        raster.resize(len, 0);
        Ok(raster)
    }
}
