//! Codec sessions over memory streams
//!
//! A session opens the TIFF codec against a [`MemoryReader`](crate::io::MemoryReader)
//! or [`MemoryWriter`](crate::io::MemoryWriter), runs one decode or encode,
//! and closes the codec before returning. Failures carry the message the
//! codec left in the thread's [`error_channel`].

pub mod decode;
pub mod encode;
pub mod error;
pub mod error_channel;

#[cfg(test)]
mod tests;

pub use decode::{decode, DecodeLimits, DecodedImage};
pub use encode::{encode, EncodeOptions};
pub use error::SessionError;

/// Name the codec sees for memory streams
pub(crate) const STREAM_NAME: &str = "mem";

/// Leaves the failure's message in the error channel and passes the error on
///
/// Cleanup after a failing codec call may report errors of its own; this
/// puts back the message the caller is given.
pub(crate) fn report(err: SessionError) -> SessionError {
    error_channel::set(err.message());
    err
}
