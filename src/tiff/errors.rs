//! Custom error types for TIFF processing

use std::fmt;
use std::io;

use crate::utils::tag_utils;

/// TIFF-specific error types
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// Stream too short to hold a TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// A field the directory cannot be used without
    MissingRequiredField(&'static str),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Image layout or sample encoding the RGBA path cannot handle
    UnsupportedImage(String),
    /// A strip or tile could not be read from the stream
    ChunkReadError { chunk: usize, offset: u64, wanted: u64, available: u64 },
    /// An allocation of the given size failed
    OutOfMemory(usize),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidHeader => write!(f, "Cannot read TIFF header"),
            TiffError::InvalidByteOrder(v) => write!(f, "Not a TIFF file, bad byte order marker {:#06x}", v),
            TiffError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Not a TIFF file, bad version number {} ({:#x})", v, v),
            TiffError::TagNotFound(tag) => write!(f, "Tag {} ({}) not found", tag, tag_utils::get_tag_name(*tag)),
            TiffError::MissingRequiredField(name) => write!(f, "TIFF directory is missing required \"{}\" field", name),
            TiffError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            TiffError::UnsupportedCompression(c) => write!(f, "Compression scheme {} ({}) is not implemented",
                                                           c, tag_utils::get_compression_name(*c)),
            TiffError::UnsupportedImage(msg) => write!(f, "Sorry, can not handle image {}", msg),
            TiffError::ChunkReadError { chunk, offset, wanted, available } => write!(f,
                "Read error on strip/tile {}; wanted {} bytes at offset {}, stream holds {}",
                chunk, wanted, offset, available),
            TiffError::OutOfMemory(size) => write!(f, "Out of memory allocating {} bytes", size),
            TiffError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TiffError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}
