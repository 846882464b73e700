// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for YOLO detectors

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLO exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Gray value Ultralytics pads letterboxed images with
pub const LETTERBOX_FILL: u8 = 114;

/// Geometry of a letterbox transform, used to map boxes back to the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to both axes
    pub scale: f32,
    /// Horizontal padding on the left, in model pixels
    pub pad_x: u32,
    /// Vertical padding on the top, in model pixels
    pub pad_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
    /// Square model input size
    pub target_size: u32,
}

impl LetterboxInfo {
    /// Compute the transform that fits `width x height` inside `target_size`
    pub fn new(width: u32, height: u32, target_size: u32) -> Self {
        let scale_w = target_size as f32 / width.max(1) as f32;
        let scale_h = target_size as f32 / height.max(1) as f32;
        let scale = scale_w.min(scale_h);

        let (new_w, new_h) = scaled_size(width, height, scale, target_size);

        Self {
            scale,
            pad_x: (target_size - new_w) / 2,
            pad_y: (target_size - new_h) / 2,
            original_width: width,
            original_height: height,
            target_size,
        }
    }

    /// Size of the resized content inside the padded canvas
    pub fn resized_size(&self) -> (u32, u32) {
        scaled_size(
            self.original_width,
            self.original_height,
            self.scale,
            self.target_size,
        )
    }

    /// Map an `[x1, y1, x2, y2]` box from model space to original pixels,
    /// clipped to the image bounds
    pub fn to_original(&self, bbox: [f32; 4]) -> [f32; 4] {
        let w = self.original_width as f32;
        let h = self.original_height as f32;
        let unpad_x = |x: f32| ((x - self.pad_x as f32) / self.scale).clamp(0.0, w);
        let unpad_y = |y: f32| ((y - self.pad_y as f32) / self.scale).clamp(0.0, h);

        [
            unpad_x(bbox[0]),
            unpad_y(bbox[1]),
            unpad_x(bbox[2]),
            unpad_y(bbox[3]),
        ]
    }
}

fn scaled_size(width: u32, height: u32, scale: f32, target_size: u32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);
    (new_w, new_h)
}

/// Resize keeping aspect ratio and pad to a square canvas
pub fn letterbox(image: &RgbImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let info = LetterboxInfo::new(image.width(), image.height(), target_size);
    let (new_w, new_h) = info.resized_size();

    let mut canvas = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if (new_w, new_h) == image.dimensions() {
        imageops::replace(&mut canvas, image, info.pad_x as i64, info.pad_y as i64);
    } else {
        let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
        imageops::replace(&mut canvas, &resized, info.pad_x as i64, info.pad_y as i64);
    }

    (canvas, info)
}

/// Preprocess an image for a YOLO detector
///
/// Steps:
/// 1. Letterbox to `target_size x target_size`
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &RgbImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (canvas, info) = letterbox(image, target_size);

    let size = target_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}
