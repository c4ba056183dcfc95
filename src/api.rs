//! Safe entry points for in-memory TIFF decoding and encoding
//!
//! [`BareTiff`] carries a [`Config`] and runs one codec session per call.
//! The free functions [`decode`] and [`encode`] use the default configuration.

use log::debug;

use crate::session::{self, DecodeLimits, DecodedImage, EncodeOptions, SessionError};

/// Error returned by every entry point
pub type Error = SessionError;

/// Limits and options applied to each call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    decode_limits: DecodeLimits,
    encode_options: EncodeOptions,
}

impl Config {
    /// Default limits: 1 GiB rasters, ~8 KiB strips, unbounded output
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest decoded raster, in bytes
    pub fn max_raster_bytes(mut self, bytes: usize) -> Self {
        self.decode_limits.max_raster_bytes = bytes;
        self
    }

    /// Rows per strip of encoded images
    pub fn rows_per_strip(mut self, rows: u32) -> Self {
        self.encode_options.rows_per_strip = Some(rows);
        self
    }

    /// Largest encoded file, in bytes
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.encode_options.max_output_bytes = Some(bytes);
        self
    }

    pub fn decode_limits(&self) -> &DecodeLimits {
        &self.decode_limits
    }

    pub fn encode_options(&self) -> &EncodeOptions {
        &self.encode_options
    }
}

/// Decoder and encoder for TIFF images held in memory
#[derive(Debug, Clone, Default)]
pub struct BareTiff {
    config: Config,
}

impl BareTiff {
    /// Create an instance with the given configuration
    pub fn new(config: Config) -> Self {
        BareTiff { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decode the first image of a TIFF file
    ///
    /// # Arguments
    /// * `data` - The complete file
    ///
    /// # Returns
    /// The image as 8-bit RGBA with a top-left origin, or the codec's error
    pub fn decode(&self, data: &[u8]) -> Result<DecodedImage, Error> {
        debug!("Decoding {} bytes", data.len());
        session::decode(data, &self.config.decode_limits)
    }

    /// Encode RGBA pixels as an uncompressed TIFF file
    ///
    /// # Arguments
    /// * `data` - Rows of `width × 4` bytes, top row first
    /// * `width` - Image width in pixels, 1 to `u32::MAX`
    /// * `height` - Image height in pixels, 1 to `u32::MAX`
    ///
    /// # Returns
    /// The complete file, or an argument error if `data` is smaller than
    /// `width × height × 4` bytes
    pub fn encode(&self, data: &[u8], width: i64, height: i64) -> Result<Vec<u8>, Error> {
        let width = dimension("width", width)?;
        let height = dimension("height", height)?;
        debug!("Encoding {}x{} image from {} bytes", width, height, data.len());
        session::encode(data, width, height, &self.config.encode_options)
    }

    /// Encode a previously decoded image
    pub fn encode_image(&self, image: &DecodedImage) -> Result<Vec<u8>, Error> {
        self.encode(&image.data, image.width as i64, image.height as i64)
    }
}

/// Decode with the default configuration
pub fn decode(data: &[u8]) -> Result<DecodedImage, Error> {
    BareTiff::default().decode(data)
}

/// Encode with the default configuration
pub fn encode(data: &[u8], width: i64, height: i64) -> Result<Vec<u8>, Error> {
    BareTiff::default().encode(data, width, height)
}

fn dimension(name: &str, value: i64) -> Result<u32, Error> {
    u32::try_from(value)
        .ok()
        .filter(|&value| value > 0)
        .ok_or_else(|| session::report(SessionError::Argument(format!(
            "Invalid {} {}: must be between 1 and {}", name, value, u32::MAX))))
}
