//! Stream adapters between memory buffers and the TIFF codec
//!
//! The codec never touches a buffer directly. It talks to a [`ClientIo`]
//! implementation through five operations (read, write, seek, close, size),
//! and the memory-backed reader and writer here supply them.

pub mod byte_order;
pub mod client_io;
pub mod memory_reader;
pub mod memory_writer;
pub mod seekable;

#[cfg(test)]
mod tests;

pub use client_io::{ClientIo, ClientStream, Whence};
pub use memory_reader::MemoryReader;
pub use memory_writer::{GrowableBuffer, MemoryWriter};
