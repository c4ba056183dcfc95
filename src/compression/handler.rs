//! Compression handler trait definition

use crate::tiff::errors::{TiffError, TiffResult};

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress one strip or tile
    ///
    /// `expected_len` is the size of the decoded chunk. Output beyond it is
    /// not produced; a shorter result means the chunk ran out of data.
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>>;

    /// Compress the data; used to build compressed test fixtures
    #[cfg(test)]
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;
}

/// Empty output buffer able to hold a decoded chunk without reallocating
pub(crate) fn output_buffer(expected_len: usize) -> TiffResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(expected_len).map_err(|_| TiffError::OutOfMemory(expected_len))?;
    Ok(buffer)
}
