use std::ptr;

use crate::ffi::types::{BareTiffBuffer, BareTiffImage};

/// Free a buffer returned by [`bare_tiff_encode`](crate::ffi::bare_tiff_encode).
///
/// The struct is zeroed afterwards, so freeing it again is a no-op.
///
/// # Safety
/// `buffer` must be either null or a valid pointer to a `BareTiffBuffer`.
/// If `buffer->data` is non-null, it must have originated from this library.
#[no_mangle]
pub unsafe extern "C" fn bare_tiff_buffer_free(buffer: *mut BareTiffBuffer) {
    crate::ffi::ffi_boundary((), || {
        if buffer.is_null() {
            return;
        }

        let buffer_ref = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *buffer }
        };
        release(buffer_ref);
    });
}

/// Free the pixel data of an image returned by [`bare_tiff_decode`](crate::ffi::bare_tiff_decode).
///
/// # Safety
/// `image` must be either null or a valid pointer to a `BareTiffImage`
/// whose data, if non-null, originated from this library.
#[no_mangle]
pub unsafe extern "C" fn bare_tiff_image_free(image: *mut BareTiffImage) {
    crate::ffi::ffi_boundary((), || {
        if image.is_null() {
            return;
        }

        let image_ref = {
            // SAFETY: Pointer validity is guaranteed by the caller.
            unsafe { &mut *image }
        };
        release(&mut image_ref.data);
        image_ref.width = 0;
        image_ref.height = 0;
    });
}

fn release(buffer: &mut BareTiffBuffer) {
    if !buffer.data.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(buffer.data, buffer.len);
        // SAFETY: `data` was allocated as a `Box<[u8]>` by `BareTiffBuffer::from_vec`.
        unsafe {
            drop(Box::from_raw(slice_ptr));
        }
    }

    *buffer = BareTiffBuffer::default();
}
