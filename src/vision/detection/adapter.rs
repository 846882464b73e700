// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Normalizes raw detector output into labelled detections

use image::RgbImage;
use std::sync::Arc;

use super::errors::InferenceError;
use super::model::ObjectDetector;
use super::types::{Detection, DetectorMetadata, RawDetection};

/// Wraps a detector and turns its candidates into [`Detection`] records
#[derive(Clone)]
pub struct DetectionAdapter {
    detector: Arc<dyn ObjectDetector>,
}

impl std::fmt::Debug for DetectionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionAdapter")
            .field("model", &self.detector.metadata().name)
            .finish()
    }
}

impl DetectionAdapter {
    pub fn new(detector: Arc<dyn ObjectDetector>) -> Self {
        Self { detector }
    }

    pub fn metadata(&self) -> DetectorMetadata {
        self.detector.metadata()
    }

    /// Run the detector and normalize every candidate
    ///
    /// Order is preserved. An image with no objects yields an empty vec.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, InferenceError> {
        let raw = self.detector.infer(image)?;
        raw.into_iter().map(|d| self.normalize(d)).collect()
    }

    fn normalize(&self, raw: RawDetection) -> Result<Detection, InferenceError> {
        if !raw.confidence.is_finite() || raw.bbox.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidOutput(format!(
                "non-finite detection for class {}: confidence {}, bbox {:?}",
                raw.class_id, raw.confidence, raw.bbox
            )));
        }

        let [a, b, c, d] = raw.bbox;

        Ok(Detection {
            label: self.detector.class_names().label(raw.class_id),
            confidence: raw.confidence.clamp(0.0, 1.0),
            bbox: [a.min(c), b.min(d), a.max(c), b.max(d)],
        })
    }
}
