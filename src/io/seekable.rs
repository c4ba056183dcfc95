//! Seekable reader trait
//!
//! The codec reads through a [`ClientStream`](crate::io::ClientStream), tests
//! read through `Cursor`s; both satisfy this trait.

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek {}

// Blanket implementation for any type that implements the required traits
impl<T: Read + Seek> SeekableReader for T {}
