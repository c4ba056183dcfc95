//! C ABI for host runtimes
//!
//! Results are returned as owned buffers the host must hand back to
//! [`bare_tiff_buffer_free`] (or [`bare_tiff_image_free`]) exactly once.
//! Failures return a non-zero [`BareTiffResult`]; the message is available
//! from [`bare_tiff_last_error`] on the same thread.

mod buffer;
mod codec;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use buffer::{bare_tiff_buffer_free, bare_tiff_image_free};
pub use codec::{bare_tiff_decode, bare_tiff_encode};
pub use types::{BareTiffBuffer, BareTiffImage, BareTiffResult};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message of the last failed call on this thread; empty after a success
///
/// The pointer stays valid until the next call on this thread.
#[no_mangle]
pub extern "C" fn bare_tiff_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
