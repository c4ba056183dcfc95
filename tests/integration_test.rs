//! Integration tests for the public decode/encode surface

use std::thread;

use bare_tiff::ffi::{bare_tiff_buffer_free, bare_tiff_encode, BareTiffBuffer, BareTiffResult};
use bare_tiff::session::error_channel;
use bare_tiff::{decode, encode, BareTiff, Config, Error};
use image::ImageFormat;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[(x * 7) as u8, (y * 11) as u8, (x + y) as u8, 255 - x as u8]);
        }
    }
    pixels
}

#[test]
fn test_round_trip() {
    init_logging();
    let pixels = gradient(37, 23);

    let bytes = encode(&pixels, 37, 23).unwrap();
    let image = decode(&bytes).unwrap();

    assert_eq!((image.width, image.height), (37, 23));
    assert_eq!(image.data, pixels);
}

#[test]
fn test_encoded_file_reads_in_image_crate() {
    init_logging();
    let pixels = gradient(64, 40);
    let bytes = BareTiff::new(Config::new().rows_per_strip(7)).encode(&pixels, 64, 40).unwrap();

    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Tiff).unwrap();

    let rgba = decoded.to_rgba8();
    assert_eq!(rgba.dimensions(), (64, 40));
    assert_eq!(rgba.into_raw(), pixels);
}

#[test]
fn test_image_crate_file_decodes() {
    init_logging();
    // Opaque, so the result is the same whether or not alpha is marked unassociated
    let mut pixels = gradient(19, 5);
    pixels.chunks_mut(4).for_each(|p| p[3] = 255);
    let buffer = image::RgbaImage::from_raw(19, 5, pixels.clone()).unwrap();
    let mut bytes = std::io::Cursor::new(Vec::new());
    buffer.write_to(&mut bytes, ImageFormat::Tiff).unwrap();

    let image = decode(bytes.get_ref()).unwrap();

    assert_eq!((image.width, image.height), (19, 5));
    assert_eq!(image.data, pixels);
}

#[test]
fn test_bad_inputs_report_messages() {
    init_logging();
    let bytes = encode(&gradient(8, 8), 8, 8).unwrap();

    for input in [&bytes[..20], &[0u8; 64][..], &[][..]] {
        let err = decode(input).unwrap_err();
        assert!(!err.message().is_empty());
        assert_eq!(error_channel::last_error(), err.message());
    }
}

#[test]
fn test_missing_image_length() {
    init_logging();
    let mut buffer = Vec::new();

    // TIFF header (little-endian), IFD at 8
    buffer.extend_from_slice(&[0x49, 0x49, 42, 0, 8, 0, 0, 0]);
    buffer.extend_from_slice(&[1, 0]);
    // ImageWidth (tag 256) = 4
    buffer.extend_from_slice(&[0, 1, 4, 0, 1, 0, 0, 0, 4, 0, 0, 0]);
    buffer.extend_from_slice(&[0, 0, 0, 0]);

    let err = decode(&buffer).unwrap_err();

    assert!(matches!(err, Error::Open(_)));
    assert_eq!(err.message(), "TIFF directory is missing required \"ImageLength\" field");
}

#[test]
fn test_errors_stay_on_their_thread() {
    init_logging();
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            thread::spawn(move || {
                let input = vec![i; 16];
                let err = decode(&input).unwrap_err();
                let message = format!("Not a TIFF file, bad byte order marker 0x{:02x}{:02x}", i, i);
                assert_eq!(err.message(), message);
                for _ in 0..50 {
                    thread::yield_now();
                    assert_eq!(error_channel::last_error(), message);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_output_limit() {
    init_logging();
    let pixels = gradient(32, 32);

    let result = BareTiff::new(Config::new().max_output_bytes(1024)).encode(&pixels, 32, 32);

    assert!(matches!(result, Err(Error::Encode(_))));
}

#[test]
fn test_ffi_buffer_free_twice() {
    let pixels = gradient(4, 4);
    let mut buffer = BareTiffBuffer::default();

    // SAFETY: `pixels` is live and `buffer` is a local owned by this test.
    let result = unsafe { bare_tiff_encode(pixels.as_ptr(), pixels.len(), 4, 4, &mut buffer) };
    assert_eq!(result, BareTiffResult::Ok);
    assert!(buffer.len > 8);

    // SAFETY: The buffer came from bare_tiff_encode; the second call sees it zeroed.
    unsafe {
        bare_tiff_buffer_free(&mut buffer);
        bare_tiff_buffer_free(&mut buffer);
    }
    assert!(buffer.data.is_null());
}
