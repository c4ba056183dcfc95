//! Handler for TIFF LZW compressed data
//!
//! TIFF LZW packs codes most significant bit first and widens the code one
//! entry early ("early change"): the width grows when the next free code
//! reaches `2^width - 1` on decode, which the encoder mirrors by growing
//! once the table reaches `2^width`.

#[cfg(test)]
use std::collections::HashMap;
use log::trace;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{output_buffer, CompressionHandler};

const CLEAR_CODE: u16 = 256;
const EOI_CODE: u16 = 257;
const FIRST_CODE: u16 = 258;
const MIN_BITS: u8 = 9;
const MAX_BITS: u8 = 12;
const TABLE_SIZE: usize = 1 << MAX_BITS;
#[cfg(test)]
/// The encoder clears the table once its next free code reaches this value
const ENCODER_TABLE_LIMIT: u16 = (TABLE_SIZE - 2) as u16;

/// LZW compression handler (compression code 5)
pub struct LzwHandler;

/// A decoded string, stored as its last byte plus the code of its prefix
#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    prefix: u16,
    byte: u8,
    first: u8,
    len: u32,
}

struct MsbBitReader<'a> {
    data: &'a [u8],
    position: usize,
    buffer: u32,
    bits: u8,
}

impl<'a> MsbBitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        MsbBitReader { data, position: 0, buffer: 0, bits: 0 }
    }

    fn read(&mut self, width: u8) -> Option<u16> {
        while self.bits < width {
            let byte = *self.data.get(self.position)?;
            self.position += 1;
            self.buffer = (self.buffer << 8) | byte as u32;
            self.bits += 8;
        }

        self.bits -= width;
        let code = (self.buffer >> self.bits) & ((1 << width) - 1);
        self.buffer &= (1 << self.bits) - 1;
        Some(code as u16)
    }
}

#[cfg(test)]
struct MsbBitWriter {
    output: Vec<u8>,
    buffer: u32,
    bits: u8,
}

#[cfg(test)]
impl MsbBitWriter {
    fn new(capacity: usize) -> Self {
        MsbBitWriter { output: Vec::with_capacity(capacity), buffer: 0, bits: 0 }
    }

    fn write(&mut self, code: u16, width: u8) {
        self.buffer = (self.buffer << width) | code as u32;
        self.bits += width;
        while self.bits >= 8 {
            self.bits -= 8;
            self.output.push((self.buffer >> self.bits) as u8);
        }
        self.buffer &= (1 << self.bits) - 1;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.output.push((self.buffer << (8 - self.bits)) as u8);
        }
        self.output
    }
}

fn initial_table() -> Vec<Entry> {
    let mut table = vec![Entry::default(); TABLE_SIZE];
    for (code, entry) in table.iter_mut().enumerate().take(256) {
        *entry = Entry { prefix: 0, byte: code as u8, first: code as u8, len: 1 };
    }
    table
}

/// Appends the string for `code` to `output`
fn emit(table: &[Entry], code: u16, output: &mut Vec<u8>) {
    let len = table[code as usize].len as usize;
    let start = output.len();
    output.resize(start + len, 0);

    let mut current = code as usize;
    for slot in output[start..].iter_mut().rev() {
        let entry = table[current];
        *slot = entry.byte;
        current = entry.prefix as usize;
    }
}

fn corrupted(code: u16, next: u16) -> TiffError {
    TiffError::GenericError(format!(
        "LZW: corrupted data, code {} beyond the next free code {}", code, next))
}

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut output = output_buffer(expected_len)?;
        let mut reader = MsbBitReader::new(data);
        let mut table = initial_table();
        let mut width = MIN_BITS;
        let mut next = FIRST_CODE;
        let mut previous: Option<u16> = None;

        while output.len() < expected_len {
            let code = match reader.read(width) {
                Some(code) => code,
                None => break,
            };

            if code == CLEAR_CODE {
                width = MIN_BITS;
                next = FIRST_CODE;
                previous = None;
                continue;
            }
            if code == EOI_CODE {
                break;
            }

            let prev = match previous {
                Some(prev) => prev,
                None => {
                    if code >= CLEAR_CODE {
                        return Err(corrupted(code, next));
                    }
                    emit(&table, code, &mut output);
                    previous = Some(code);
                    continue;
                }
            };

            let first = if code < next {
                table[code as usize].first
            } else if code == next && (next as usize) < TABLE_SIZE {
                table[prev as usize].first
            } else {
                return Err(corrupted(code, next));
            };

            if (next as usize) < TABLE_SIZE {
                let base = table[prev as usize];
                table[next as usize] = Entry {
                    prefix: prev,
                    byte: first,
                    first: base.first,
                    len: base.len + 1,
                };
                next += 1;
                if next as u32 >= (1u32 << width) - 1 && width < MAX_BITS {
                    width += 1;
                }
            }

            emit(&table, code, &mut output);
            previous = Some(code);
        }

        trace!("LZW decoded {} bytes into {}", data.len(), output.len());
        output.truncate(expected_len);
        Ok(output)
    }

    #[cfg(test)]
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut writer = MsbBitWriter::new(data.len() / 2 + 4);
        let mut dictionary: HashMap<(u16, u8), u16> = HashMap::new();
        let mut width = MIN_BITS;
        let mut next = FIRST_CODE;

        writer.write(CLEAR_CODE, width);

        let (&first, rest) = match data.split_first() {
            Some(split) => split,
            None => {
                writer.write(EOI_CODE, width);
                return Ok(writer.finish());
            }
        };

        let mut current = first as u16;
        for &byte in rest {
            if let Some(&code) = dictionary.get(&(current, byte)) {
                current = code;
                continue;
            }

            writer.write(current, width);
            dictionary.insert((current, byte), next);
            next += 1;

            if next == ENCODER_TABLE_LIMIT {
                writer.write(CLEAR_CODE, width);
                dictionary.clear();
                next = FIRST_CODE;
                width = MIN_BITS;
            } else if next as u32 >= 1u32 << width && width < MAX_BITS {
                width += 1;
            }

            current = byte as u16;
        }

        writer.write(current, width);
        // The decoder adds one more entry after the final code
        next += 1;
        if next as u32 >= 1u32 << width && width < MAX_BITS {
            width += 1;
        }
        writer.write(EOI_CODE, width);

        Ok(writer.finish())
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        compression::LZW as u64
    }
}
