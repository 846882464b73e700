// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - Image decoding with size and dimension bounds
//! - YOLO detection via ONNX Runtime
//! - The decode-then-detect pipeline used by the HTTP API

pub mod detection;
pub mod image_utils;
pub mod model_manager;
pub mod service;

pub use image_utils::{
    decode_image_bytes, decode_image_bytes_with_limits, detect_format, DecodeError, DecodedImage,
    DecoderLimits, ImageInfo,
};
pub use model_manager::{VisionModelConfig, VisionModelManager};
pub use service::DetectionService;
