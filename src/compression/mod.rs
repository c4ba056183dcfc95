//! Compression handling for TIFF strips and tiles
//!
//! This module implements strategies for handling different compression methods.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod lzw;
mod packbits;
mod zstd;


pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
pub use zstd::ZstdHandler;
