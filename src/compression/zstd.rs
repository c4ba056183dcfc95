//! Handler for ZSTD compressed data

use std::io::Read;
use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{output_buffer, CompressionHandler};
use log::{debug, warn};

/// Level used when building compressed fixtures
#[cfg(test)]
const FIXTURE_LEVEL: i32 = 3;

/// ZSTD compression handler (compression codes 50000 and 14)
pub struct ZstdHandler;

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        debug!("ZSTD decompressing {} bytes", data.len());
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let mut decompressed_data = output_buffer(expected_len)?;
        let result = zstd::stream::read::Decoder::new(data)
            .and_then(|decoder| decoder.take(expected_len as u64).read_to_end(&mut decompressed_data));

        match result {
            Ok(_) => {
                debug!("ZSTD decompressed to {} bytes", decompressed_data.len());
                Ok(decompressed_data)
            },
            Err(e) => {
                warn!("ZSTD decompression error: {}", e);
                Err(TiffError::GenericError(format!("ZSTD decompression error: {}", e)))
            }
        }
    }

    #[cfg(test)]
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        debug!("ZSTD compressing {} bytes with level {}", data.len(), FIXTURE_LEVEL);
        if data.is_empty() {
            return Ok(Vec::new());
        }

        match zstd::encode_all(data, FIXTURE_LEVEL) {
            Ok(compressed) => {
                debug!("ZSTD compressed to {} bytes", compressed.len());
                Ok(compressed)
            },
            Err(e) => {
                warn!("ZSTD compression error: {}", e);
                Err(TiffError::GenericError(format!("ZSTD compression error: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        compression::ZSTD as u64
    }
}
