//! Handler for Adobe Deflate compressed data

use std::io::Read;
use flate2::read::ZlibDecoder;
use log::warn;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{output_buffer, CompressionHandler};

/// Adobe Deflate (Zlib) compression handler (compression codes 8 and 32946)
pub struct AdobeDeflateHandler;

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data).take(expected_len as u64);
        let mut decompressed_data = output_buffer(expected_len)?;
        match decoder.read_to_end(&mut decompressed_data) {
            Ok(_) => Ok(decompressed_data),
            Err(e) => {
                warn!("Deflate decompression error: {}", e);
                Err(TiffError::GenericError(format!("Decoding error with Deflate: {}", e)))
            }
        }
    }

    #[cfg(test)]
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        match encoder.write_all(data) {
            Ok(_) => (),
            Err(e) => return Err(TiffError::IoError(e)),
        }

        match encoder.finish() {
            Ok(compressed) => Ok(compressed),
            Err(e) => Err(TiffError::IoError(e))
        }
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u64 {
        compression::DEFLATE as u64
    }
}
