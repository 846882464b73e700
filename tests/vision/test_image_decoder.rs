// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image decoder tests across formats and failure modes

use image::{ImageFormat, Rgb, RgbImage};
use yolo_detection_api::vision::{
    decode_image_bytes, decode_image_bytes_with_limits, DecodeError, DecoderLimits,
};

use crate::common::{encode, image_with_square};

#[test]
fn test_decodes_common_formats() {
    let image = image_with_square(40, 30, 5, 5, 10);

    for format in [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
    ] {
        let bytes = encode(&image, format);
        let decoded = decode_image_bytes(&bytes)
            .unwrap_or_else(|e| panic!("{:?} failed to decode: {}", format, e));

        assert_eq!((decoded.width(), decoded.height()), (40, 30), "{:?}", format);
        assert_eq!(decoded.info.format, format);
    }
}

#[test]
fn test_lossless_formats_preserve_pixels() {
    let image = image_with_square(12, 12, 3, 3, 4);

    for format in [ImageFormat::Png, ImageFormat::Bmp] {
        let decoded = decode_image_bytes(&encode(&image, format)).unwrap();
        assert_eq!(decoded.pixels.get_pixel(4, 4), &Rgb([255, 255, 255]));
        assert_eq!(decoded.pixels.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }
}

#[test]
fn test_zero_bytes_rejected() {
    assert!(matches!(decode_image_bytes(&[]), Err(DecodeError::EmptyData)));
}

#[test]
fn test_text_rejected() {
    let result = decode_image_bytes(b"hello, this is plain text");
    assert!(matches!(result, Err(DecodeError::UnsupportedFormat)));
}

#[test]
fn test_corrupt_png_rejected() {
    let mut bytes = encode(&image_with_square(32, 32, 4, 4, 8), ImageFormat::Png);
    let len = bytes.len();
    // Clobber the IDAT payload and CRC
    for b in &mut bytes[len / 2..len - 12] {
        *b = 0xAB;
    }

    let result = decode_image_bytes(&bytes);
    assert!(matches!(result, Err(DecodeError::DecodeFailed(_))));
}

#[test]
fn test_dimension_bound_checked_before_allocation() {
    let bytes = encode(&RgbImage::new(300, 20), ImageFormat::Png);
    let limits = DecoderLimits {
        max_dimension: 256,
        ..DecoderLimits::default()
    };

    let result = decode_image_bytes_with_limits(&bytes, limits);
    assert!(matches!(result, Err(DecodeError::LimitsExceeded(_))));
}

#[test]
fn test_byte_bound_checked_first() {
    let bytes = encode(&RgbImage::new(8, 8), ImageFormat::Png);
    let limits = DecoderLimits {
        max_bytes: bytes.len() - 1,
        ..DecoderLimits::default()
    };

    let result = decode_image_bytes_with_limits(&bytes, limits);
    assert!(matches!(result, Err(DecodeError::TooLarge(_, _))));
}

#[test]
fn test_decode_is_deterministic() {
    let bytes = encode(&image_with_square(20, 20, 1, 2, 5), ImageFormat::Jpeg);
    let a = decode_image_bytes(&bytes).unwrap();
    let b = decode_image_bytes(&bytes).unwrap();
    assert_eq!(a.pixels, b.pixels);
}
