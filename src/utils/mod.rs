//! Utility modules for common functionality
//!
//! Helpers shared by the TIFF reader and writer.

pub(crate) mod ifd_utils;
pub(crate) mod format_utils;
pub mod tag_utils;
pub(crate) mod write_utils;
