use std::ptr;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BareTiffResult {
    Ok = 0,
    /// Null pointers, bad dimensions or a pixel buffer that is too small
    InvalidArgument = 1,
    /// The codec failed to open, decode or encode
    CodecError = 2,
    /// A panic was caught at the boundary
    Internal = 99,
}

/// Byte buffer allocated by this library
#[repr(C)]
#[derive(Debug)]
pub struct BareTiffBuffer {
    pub data: *mut u8,
    pub len: usize,
}

impl Default for BareTiffBuffer {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }
}

impl BareTiffBuffer {
    /// Hands ownership of `bytes` to the caller
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        let boxed: Box<[u8]> = bytes.into_boxed_slice();
        let len = boxed.len();
        let data = if len == 0 {
            ptr::null_mut()
        } else {
            Box::into_raw(boxed) as *mut u8
        };

        Self { data, len }
    }
}

/// Decoded RGBA image; `data` holds `width * height * 4` bytes
#[repr(C)]
#[derive(Debug, Default)]
pub struct BareTiffImage {
    pub width: u32,
    pub height: u32,
    pub data: BareTiffBuffer,
}
