// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration loaded from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::vision::detection::postprocessing::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS,
};
use crate::vision::detection::DetectorConfig;
use crate::vision::image_utils::{DecoderLimits, MAX_IMAGE_DIMENSION, MAX_IMAGE_SIZE};
use crate::vision::model_manager::VisionModelConfig;

/// Configuration for the detection service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path to the ONNX detection model
    pub model_path: PathBuf,
    /// Labels file overriding model metadata names
    pub labels_path: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub inference_threads: usize,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Largest accepted image width or height
    pub max_image_dimension: u32,
    /// Allowed CORS origins, `*` allows any
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("models/best-calculo-peso.onnx"),
            labels_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            inference_threads: 4,
            max_upload_bytes: MAX_IMAGE_SIZE,
            max_image_dimension: MAX_IMAGE_DIMENSION,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: parse_value(lookup("API_PORT")).unwrap_or(defaults.port),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            labels_path: lookup("MODEL_LABELS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            confidence_threshold: parse_value(lookup("CONFIDENCE_THRESHOLD"))
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: parse_value(lookup("IOU_THRESHOLD"))
                .unwrap_or(defaults.iou_threshold),
            max_detections: parse_value(lookup("MAX_DETECTIONS"))
                .unwrap_or(defaults.max_detections),
            inference_threads: parse_value(lookup("INFERENCE_THREADS"))
                .unwrap_or(defaults.inference_threads),
            max_upload_bytes: parse_value(lookup("MAX_UPLOAD_BYTES"))
                .unwrap_or(defaults.max_upload_bytes),
            max_image_dimension: parse_value(lookup("MAX_IMAGE_DIMENSION"))
                .unwrap_or(defaults.max_image_dimension),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.cors_allowed_origins),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "Confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if self.max_detections == 0 {
            return Err("Max detections must be greater than 0".to_string());
        }
        if self.inference_threads == 0 {
            return Err("Inference threads must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("Max upload size must be greater than 0".to_string());
        }
        if self.max_image_dimension == 0 {
            return Err("Max image dimension must be greater than 0".to_string());
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Socket address the server binds to
    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            intra_threads: self.inference_threads,
            input_size: None,
        }
    }

    pub fn vision_model_config(&self) -> VisionModelConfig {
        VisionModelConfig {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            detector: self.detector_config(),
        }
    }

    pub fn decoder_limits(&self) -> DecoderLimits {
        DecoderLimits {
            max_bytes: self.max_upload_bytes,
            max_dimension: self.max_image_dimension,
        }
    }
}

fn parse_value<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}
