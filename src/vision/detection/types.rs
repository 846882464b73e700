// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection record types

use serde::{Deserialize, Serialize};

/// A candidate object as emitted by the detector runtime
///
/// Coordinates are absolute pixels in the original image, `x1,y1` top-left
/// and `x2,y2` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

/// A normalized detection returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name, or the stringified class index when the model has no name for it
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in pixels
    pub bbox: [f32; 4],
}

/// Response for a single uploaded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// Upload filename, echoed back unmodified
    pub filename: String,
    /// Detections in model emission order
    pub detections: Vec<Detection>,
}

/// Static facts about the loaded detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorMetadata {
    /// Model name (file stem of the ONNX artifact)
    pub name: String,
    /// Square input size the model runs at
    pub input_size: u32,
    /// Number of classes with a known name
    pub num_classes: usize,
}
