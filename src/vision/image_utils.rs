// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding for uploaded detection payloads

use image::{ImageFormat, ImageReader, Limits, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Maximum upload size accepted by the decoder (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum width or height accepted by the decoder
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Errors raised while turning uploaded bytes into pixels.
///
/// Every variant is attributable to the request input.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image exceeds decoder limits: {0}")]
    LimitsExceeded(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Bounds applied before and during decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Maximum encoded payload size in bytes
    pub max_bytes: usize,
    /// Maximum decoded width and height in pixels
    pub max_dimension: u32,
}

impl Default for DecoderLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_IMAGE_SIZE,
            max_dimension: MAX_IMAGE_DIMENSION,
        }
    }
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// An RGB pixel grid ready for inference
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixels in RGB channel order
    pub pixels: RgbImage,
    /// Metadata about the source payload
    pub info: ImageInfo,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decode raw image bytes (for multipart uploads) with the default limits
///
/// # Returns
/// * `Ok(DecodedImage)` - RGB pixels and metadata
/// * `Err(DecodeError)` - If the bytes are not a decodable image
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    decode_image_bytes_with_limits(bytes, DecoderLimits::default())
}

/// Decode raw image bytes, rejecting payloads outside `limits`
///
/// The payload size is checked before any decoding work, and the pixel
/// dimensions are checked by the codec before the pixel buffer is allocated.
pub fn decode_image_bytes_with_limits(
    bytes: &[u8],
    limits: DecoderLimits,
) -> Result<DecodedImage, DecodeError> {
    if bytes.len() > limits.max_bytes {
        return Err(DecodeError::TooLarge(bytes.len(), limits.max_bytes));
    }

    if bytes.is_empty() {
        return Err(DecodeError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_dimension);
    decoder_limits.max_image_height = Some(limits.max_dimension);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(decoder_limits);

    let img = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(err) => DecodeError::LimitsExceeded(err.to_string()),
        other => DecodeError::DecodeFailed(other.to_string()),
    })?;

    let pixels = img.into_rgb8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(DecodeError::DecodeFailed(
            "image has zero width or height".to_string(),
        ));
    }

    let info = ImageInfo {
        width: pixels.width(),
        height: pixels.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok(DecodedImage { pixels, info })
}

/// Detect image format from magic bytes
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(DecodeError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    if bytes.len() < 4 {
        return Err(DecodeError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(DecodeError::UnsupportedFormat),
    }
}
