// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decode-then-detect pipeline shared by the HTTP handlers

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::detection::{
    Detection, DetectionAdapter, DetectionResponse, DetectorMetadata, InferenceError,
    ObjectDetector, PipelineError,
};
use super::image_utils::{decode_image_bytes_with_limits, DecodeError, DecodedImage, DecoderLimits};

/// Runs uploaded bytes through the decoder and the detector
///
/// Holds no per-request state, so one instance serves all requests.
#[derive(Debug, Clone)]
pub struct DetectionService {
    adapter: DetectionAdapter,
    limits: DecoderLimits,
}

impl DetectionService {
    pub fn new(detector: Arc<dyn ObjectDetector>, limits: DecoderLimits) -> Self {
        Self {
            adapter: DetectionAdapter::new(detector),
            limits,
        }
    }

    pub fn limits(&self) -> DecoderLimits {
        self.limits
    }

    pub fn model_info(&self) -> DetectorMetadata {
        self.adapter.metadata()
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        decode_image_bytes_with_limits(bytes, self.limits)
    }

    pub fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>, InferenceError> {
        self.adapter.detect(&image.pixels)
    }

    /// Decode `bytes` and detect objects in the result
    ///
    /// The detector is only invoked once decoding has succeeded. Blocking;
    /// async callers should run it on the blocking pool.
    pub fn process(&self, bytes: &[u8], filename: &str) -> Result<DetectionResponse, PipelineError> {
        let start = Instant::now();

        let image = self.decode(bytes)?;
        debug!(
            "Decoded {} ({}x{}, {:?}, {} bytes)",
            filename,
            image.width(),
            image.height(),
            image.info.format,
            image.info.size_bytes
        );

        let detections = self.detect(&image)?;

        info!(
            "Detected {} objects in {} ({}ms)",
            detections.len(),
            filename,
            start.elapsed().as_millis()
        );

        Ok(DetectionResponse {
            filename: filename.to_string(),
            detections,
        })
    }
}
