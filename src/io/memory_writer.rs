//! Memory-backed output stream
//!
//! Encode sessions write into a [`GrowableBuffer`] through a [`MemoryWriter`].
//! When the session completes the buffer is handed to the caller.

use std::io;

use log::{debug, warn};

use crate::io::client_io::{resolve_seek, ClientIo, Whence};

/// Owned byte buffer with amortized-doubling growth
///
/// A write that does not fit grows the allocation to `2 × (length + requested)`.
/// Prior contents are preserved across every reallocation.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
    max_capacity: Option<usize>,
}

impl GrowableBuffer {
    /// Creates an empty buffer without allocating
    pub fn new() -> Self {
        GrowableBuffer {
            data: Vec::new(),
            max_capacity: None,
        }
    }

    /// Creates an empty buffer whose allocation may never exceed `max_capacity` bytes
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        GrowableBuffer {
            data: Vec::new(),
            max_capacity: Some(max_capacity),
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated size in bytes; always `>= len()`
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Appends `bytes`, growing the allocation when needed
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let needed = self.data.len().checked_add(bytes.len())
            .ok_or_else(|| out_of_memory(usize::MAX))?;

        if needed > self.data.capacity() {
            self.grow(needed)?;
        }

        self.data.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Transfers the written bytes out of the buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn grow(&mut self, needed: usize) -> io::Result<()> {
        let mut target = needed.saturating_mul(2);

        if let Some(max) = self.max_capacity {
            if needed > max {
                warn!("Output buffer limit of {} bytes reached (needed {})", max, needed);
                return Err(out_of_memory(needed));
            }
            target = target.min(max);
        }

        debug!("Growing output buffer from {} to {} bytes", self.data.capacity(), target);

        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| out_of_memory(target))
    }
}

fn out_of_memory(requested: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::OutOfMemory,
        format!("Failed to grow output buffer to {} bytes", requested),
    )
}

/// Append-only stream over a [`GrowableBuffer`]
///
/// The write position always equals the buffer length, so seeking is only
/// meaningful as a query of the current position.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    buffer: GrowableBuffer,
}

impl MemoryWriter {
    /// Creates a writer over an empty, unallocated buffer
    pub fn new() -> Self {
        MemoryWriter { buffer: GrowableBuffer::new() }
    }

    /// Creates a writer over an existing buffer
    pub fn with_buffer(buffer: GrowableBuffer) -> Self {
        MemoryWriter { buffer }
    }

    /// The buffer being written
    pub fn buffer(&self) -> &GrowableBuffer {
        &self.buffer
    }

    /// Ends the writer and returns everything written
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}

impl ClientIo for MemoryWriter {
    fn read(&mut self, _buf: &mut [u8]) -> usize {
        0
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.append(data)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Option<u64> {
        let len = self.buffer.len() as u64;
        let target = resolve_seek(len, len, offset, whence)?;

        // Append-only: the only reachable position is the end
        if target != len {
            return None;
        }

        Some(target)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> u64 {
        self.buffer.len() as u64
    }
}
