//! Memory-backed input stream
//!
//! Presents a borrowed byte buffer as a seekable stream for decode sessions.

use std::io;

use log::trace;

use crate::io::client_io::{resolve_seek, ClientIo, Whence};

/// Read-only stream over a borrowed byte span
///
/// The span is never copied or freed. The cursor always satisfies
/// `0 <= offset <= data.len()`.
#[derive(Debug)]
pub struct MemoryReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> MemoryReader<'a> {
    /// Creates a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        MemoryReader { data, offset: 0 }
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end of the span
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

impl ClientIo for MemoryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.offset..self.offset + count]);
        self.offset += count;

        if count < buf.len() {
            trace!("Short read: wanted {} bytes, got {} at offset {}", buf.len(), count, self.offset);
        }

        count
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Option<u64> {
        let target = resolve_seek(self.offset as u64, self.data.len() as u64, offset, whence)?;
        self.offset = target as usize;
        Some(target)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
