//! TIFF codec
//!
//! Reads the first image of a TIFF or BigTIFF stream into an RGBA raster
//! and writes uncompressed classic TIFF images, both through the
//! client-I/O streams in [`crate::io`].

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod directory;
pub mod diagnostics;
pub mod handle;
pub mod raster;
pub mod writer;
pub mod constants;
pub(crate) mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use diagnostics::{set_error_handler, with_error_handler, ErrorHandler};
pub use directory::{ChunkLayout, ImageDirectory};
pub use errors::{TiffError, TiffResult};
pub use handle::{TiffDecoder, TiffEncoder};
pub use ifd::{IFD, IFDEntry};
pub use raster::Orientation;
pub use reader::TiffReader;
pub use types::TIFF;
