//! Client I/O contract consumed by the TIFF codec
//!
//! A codec session is opened against anything implementing [`ClientIo`].
//! The trait is deliberately the five-callback shape a file-handle oriented
//! codec expects, so the same session code runs over memory buffers.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Origin for a [`ClientIo::seek`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute offset from the start of the stream
    Set,
    /// Relative to the current position
    Cur,
    /// Relative to the end of the stream
    End,
}

/// The callback set a codec session needs from its stream
pub trait ClientIo {
    /// Copies up to `buf.len()` bytes into `buf` and returns how many were copied.
    ///
    /// A short count means the end of the data was reached. It is not an error.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Appends `data` to the stream and returns how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Moves the cursor and returns the new absolute position.
    ///
    /// `None` is the failure sentinel; the cursor is left unchanged.
    fn seek(&mut self, offset: i64, whence: Whence) -> Option<u64>;

    /// Releases the stream. Called once, when the session closes.
    fn close(&mut self) -> io::Result<()>;

    /// Total size of the stream in bytes
    fn size(&self) -> u64;
}

/// Resolves `offset`/`whence` against a cursor and a length
///
/// Returns `None` when the target would be negative or past `len`.
pub(crate) fn resolve_seek(position: u64, len: u64, offset: i64, whence: Whence) -> Option<u64> {
    let base = match whence {
        Whence::Set => 0i128,
        Whence::Cur => position as i128,
        Whence::End => len as i128,
    };

    let target = base + offset as i128;
    if target < 0 || target > len as i128 {
        return None;
    }

    Some(target as u64)
}

/// Adapts a [`ClientIo`] to the standard `Read`/`Write`/`Seek` traits
///
/// This is what lets the codec use `byteorder` extension methods on top of
/// a callback-shaped stream.
pub struct ClientStream<'a> {
    io: &'a mut dyn ClientIo,
}

impl<'a> ClientStream<'a> {
    /// Wraps a client stream
    pub fn new(io: &'a mut dyn ClientIo) -> Self {
        ClientStream { io }
    }

    /// Size of the underlying stream
    pub fn size(&self) -> u64 {
        self.io.size()
    }

    /// Forwards the close callback
    pub fn close(&mut self) -> io::Result<()> {
        self.io.close()
    }
}

impl Read for ClientStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.io.read(buf))
    }
}

impl Write for ClientStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.io.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ClientStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| seek_error(pos))?;
                (offset, Whence::Set)
            }
            SeekFrom::Current(offset) => (offset, Whence::Cur),
            SeekFrom::End(offset) => (offset, Whence::End),
        };

        self.io.seek(offset, whence).ok_or_else(|| seek_error(pos))
    }
}

fn seek_error(pos: SeekFrom) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("Seek to {:?} is outside the stream", pos),
    )
}
