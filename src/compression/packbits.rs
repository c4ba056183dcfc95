//! Handler for PackBits run-length encoded data

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{output_buffer, CompressionHandler};

#[cfg(test)]
/// Longest literal or replicate run a single header byte can describe
const MAX_RUN: usize = 128;

/// PackBits compression handler (compression code 32773)
pub struct PackBitsHandler;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut output = output_buffer(expected_len)?;
        let mut i = 0;

        while i < data.len() && output.len() < expected_len {
            let header = data[i] as i8;
            i += 1;

            if header >= 0 {
                let count = header as usize + 1;
                let literal = data.get(i..i + count)
                    .ok_or_else(|| TiffError::GenericError(
                        "PackBits: not enough data for literal run".to_string()))?;
                output.extend_from_slice(literal);
                i += count;
            } else if header != -128 {
                let count = (-(header as isize)) as usize + 1;
                let value = *data.get(i)
                    .ok_or_else(|| TiffError::GenericError(
                        "PackBits: not enough data for replicate run".to_string()))?;
                i += 1;
                output.resize(output.len() + count, value);
            }
            // -128 is a no-op
        }

        output.truncate(expected_len);
        Ok(output)
    }

    #[cfg(test)]
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() + data.len() / MAX_RUN + 1);
        let mut i = 0;

        while i < data.len() {
            let mut run = 1;
            while i + run < data.len() && run < MAX_RUN && data[i + run] == data[i] {
                run += 1;
            }

            if run > 1 {
                output.push((257 - run) as u8);
                output.push(data[i]);
                i += run;
                continue;
            }

            let start = i;
            i += 1;
            while i < data.len() && i - start < MAX_RUN {
                if i + 1 < data.len() && data[i] == data[i + 1] {
                    break;
                }
                i += 1;
            }

            output.push((i - start - 1) as u8);
            output.extend_from_slice(&data[start..i]);
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        compression::PACKBITS as u64
    }
}
