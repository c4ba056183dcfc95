//! In-memory TIFF decoding and encoding
//!
//! [`decode`] turns a complete TIFF file into 8-bit RGBA pixels and
//! [`encode`] writes RGBA pixels as an uncompressed TIFF, both without
//! touching the filesystem. The [`ffi`] module exposes the same operations
//! through a C ABI.

pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod session;
pub mod api;
pub mod ffi;

pub use crate::api::{decode, encode, BareTiff, Config, Error};
pub use crate::session::{DecodeLimits, DecodedImage, EncodeOptions};

pub use tiff::TiffReader;
