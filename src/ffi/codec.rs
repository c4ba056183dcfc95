use std::slice;

use crate::api;
use crate::ffi::error;
use crate::ffi::types::{BareTiffBuffer, BareTiffImage, BareTiffResult};

/// Borrow the caller's input bytes for the duration of the call
///
/// # Safety
/// If `data` is non-null it must point to `len` readable bytes.
unsafe fn input<'a>(data: *const u8, len: usize) -> Result<&'a [u8], BareTiffResult> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(error::set_invalid_argument("data cannot be null"));
    }

    // SAFETY: Pointer validity and length are guaranteed by the caller.
    Ok(unsafe { slice::from_raw_parts(data, len) })
}

/// Decode a TIFF file held in memory into an RGBA image.
///
/// On success `out_image` receives the dimensions and an owned pixel buffer
/// to be released with `bare_tiff_image_free`. Its previous contents are
/// overwritten without being freed.
///
/// # Safety
/// `data` must point to `len` readable bytes (or be null with `len == 0`) and
/// `out_image` must be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn bare_tiff_decode(
    data: *const u8,
    len: usize,
    out_image: *mut BareTiffImage,
) -> BareTiffResult {
    crate::ffi::ffi_boundary(BareTiffResult::Internal, || {
        error::clear_error_state();

        if out_image.is_null() {
            return error::set_invalid_argument("out_image cannot be null");
        }

        // SAFETY: Forwarded caller guarantee on `data` and `len`.
        let bytes = match unsafe { input(data, len) } {
            Ok(bytes) => bytes,
            Err(result) => return result,
        };

        match api::decode(bytes) {
            Ok(image) => {
                let image_ref = {
                    // SAFETY: Pointer validity is guaranteed by the caller.
                    unsafe { &mut *out_image }
                };
                *image_ref = BareTiffImage {
                    width: image.width,
                    height: image.height,
                    data: BareTiffBuffer::from_vec(image.data),
                };
                BareTiffResult::Ok
            }
            Err(err) => error::map_session_error(&err),
        }
    })
}

/// Encode RGBA pixels as an uncompressed TIFF file.
///
/// `data` holds `height` rows of `width * 4` bytes. On success `out_buffer`
/// receives the file, to be released with `bare_tiff_buffer_free`. Its
/// previous contents are overwritten without being freed.
///
/// # Safety
/// `data` must point to `len` readable bytes (or be null with `len == 0`) and
/// `out_buffer` must be a valid writable pointer.
#[no_mangle]
pub unsafe extern "C" fn bare_tiff_encode(
    data: *const u8,
    len: usize,
    width: i64,
    height: i64,
    out_buffer: *mut BareTiffBuffer,
) -> BareTiffResult {
    crate::ffi::ffi_boundary(BareTiffResult::Internal, || {
        error::clear_error_state();

        if out_buffer.is_null() {
            return error::set_invalid_argument("out_buffer cannot be null");
        }

        // SAFETY: Forwarded caller guarantee on `data` and `len`.
        let pixels = match unsafe { input(data, len) } {
            Ok(pixels) => pixels,
            Err(result) => return result,
        };

        match api::encode(pixels, width, height) {
            Ok(bytes) => {
                let buffer_ref = {
                    // SAFETY: Pointer validity is guaranteed by the caller.
                    unsafe { &mut *out_buffer }
                };
                *buffer_ref = BareTiffBuffer::from_vec(bytes);
                BareTiffResult::Ok
            }
            Err(err) => error::map_session_error(&err),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;
    use crate::ffi::tests::last_error_text;
    use crate::ffi::{bare_tiff_buffer_free, bare_tiff_image_free};

    fn encode_pixels(pixels: &[u8], width: i64, height: i64) -> (BareTiffResult, BareTiffBuffer) {
        let mut buffer = BareTiffBuffer::default();
        // SAFETY: `pixels` is a live slice and `buffer` a local.
        let result = unsafe { bare_tiff_encode(pixels.as_ptr(), pixels.len(), width, height, &mut buffer) };
        (result, buffer)
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let pixels: Vec<u8> = (0..5 * 3 * 4).map(|i| (i * 13) as u8).collect();
        let (result, mut file) = encode_pixels(&pixels, 5, 3);
        assert_eq!(result, BareTiffResult::Ok);
        assert!(!file.data.is_null());

        let mut image = BareTiffImage::default();
        // SAFETY: `file` was filled by bare_tiff_encode.
        let result = unsafe { bare_tiff_decode(file.data, file.len, &mut image) };
        assert_eq!(result, BareTiffResult::Ok);
        assert_eq!((image.width, image.height), (5, 3));
        assert_eq!(image.data.len, pixels.len());
        // SAFETY: `image.data` holds `len` bytes allocated by this library.
        let decoded = unsafe { slice::from_raw_parts(image.data.data, image.data.len) };
        assert_eq!(decoded, &pixels[..]);
        assert!(last_error_text().is_empty());

        // SAFETY: Both structs were filled by this library.
        unsafe {
            bare_tiff_image_free(&mut image);
            bare_tiff_buffer_free(&mut file);
        }
        assert!(image.data.data.is_null());
        assert_eq!(image.width, 0);
    }

    #[test]
    fn double_free_is_a_no_op() {
        let (result, mut file) = encode_pixels(&[1, 2, 3, 4], 1, 1);
        assert_eq!(result, BareTiffResult::Ok);

        // SAFETY: `file` was filled by bare_tiff_encode; the second call sees a zeroed struct.
        unsafe {
            bare_tiff_buffer_free(&mut file);
            bare_tiff_buffer_free(&mut file);
            bare_tiff_buffer_free(ptr::null_mut());
            bare_tiff_image_free(ptr::null_mut());
        }
        assert!(file.data.is_null());
        assert_eq!(file.len, 0);
    }

    #[test]
    fn decode_failure_sets_last_error() {
        let zeros = [0u8; 64];
        let mut image = BareTiffImage::default();

        // SAFETY: `zeros` is a live array and `image` a local.
        let result = unsafe { bare_tiff_decode(zeros.as_ptr(), zeros.len(), &mut image) };

        assert_eq!(result, BareTiffResult::CodecError);
        assert_eq!(last_error_text(), "Not a TIFF file, bad byte order marker 0x0000");
        assert!(image.data.data.is_null());
    }

    #[test]
    fn invalid_arguments() {
        let mut image = BareTiffImage::default();
        // SAFETY: A null pointer with a non-zero length is rejected before any read.
        let result = unsafe { bare_tiff_decode(ptr::null(), 10, &mut image) };
        assert_eq!(result, BareTiffResult::InvalidArgument);
        assert_eq!(last_error_text(), "data cannot be null");

        // SAFETY: A null output pointer is rejected before any write.
        let result = unsafe { bare_tiff_decode(ptr::null(), 0, ptr::null_mut()) };
        assert_eq!(result, BareTiffResult::InvalidArgument);

        let (result, file) = encode_pixels(&[0; 4], 0, 1);
        assert_eq!(result, BareTiffResult::InvalidArgument);
        assert!(file.data.is_null());

        let (result, _) = encode_pixels(&[0; 4], 2, 2);
        assert_eq!(result, BareTiffResult::InvalidArgument);
        assert_eq!(last_error_text(), "Pixel buffer holds 4 bytes, a 2x2 RGBA image needs 16");
    }

    #[test]
    fn empty_input_is_a_codec_error() {
        let mut image = BareTiffImage::default();

        // SAFETY: Null data with zero length is an empty input.
        let result = unsafe { bare_tiff_decode(ptr::null(), 0, &mut image) };

        assert_eq!(result, BareTiffResult::CodecError);
        assert_eq!(last_error_text(), "Cannot read TIFF header");
    }
}
