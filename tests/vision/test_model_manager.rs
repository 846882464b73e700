// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vision Model Manager tests
//!
//! These tests verify that the VisionModelManager:
//! - Uses the expected default model path
//! - Treats a missing or unloadable model as fatal
//! - Reports metadata of an injected detector

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use yolo_detection_api::vision::detection::DetectorConfig;
use yolo_detection_api::vision::{VisionModelConfig, VisionModelManager};

use crate::common::BrightRegionDetector;

// Model path (exported by the training pipeline)
const MODEL_PATH: &str = "models/best-calculo-peso.onnx";

#[cfg(test)]
mod model_manager_tests {
    use super::*;

    // =============================================================================
    // VisionModelConfig Tests
    // =============================================================================

    /// Default config points at the exported model
    #[test]
    fn test_default_config_has_expected_path() {
        let config = VisionModelConfig::default();

        assert_eq!(config.model_path, PathBuf::from(MODEL_PATH));
        assert!(config.labels_path.is_none());
        assert_eq!(config.detector.max_detections, 300);
    }

    // =============================================================================
    // VisionModelManager Tests - Without Models
    // =============================================================================

    /// Missing model file fails startup
    #[tokio::test]
    async fn test_manager_fails_on_missing_model() {
        let config = VisionModelConfig {
            model_path: PathBuf::from("/nonexistent/yolo/model.onnx"),
            labels_path: None,
            detector: DetectorConfig::default(),
        };

        let result = VisionModelManager::new(config).await;

        let err = result.err().expect("missing model must be fatal");
        assert!(
            format!("{:#}", err).contains("not found"),
            "unexpected error: {:#}",
            err
        );
    }

    /// A file that is not an ONNX graph fails startup
    #[tokio::test]
    async fn test_manager_fails_on_corrupt_model() {
        let mut file = tempfile::Builder::new()
            .suffix(".onnx")
            .tempfile()
            .unwrap();
        file.write_all(b"this is not a protobuf graph").unwrap();

        let config = VisionModelConfig {
            model_path: file.path().to_path_buf(),
            ..VisionModelConfig::default()
        };

        let result = VisionModelManager::new(config).await;
        assert!(result.is_err(), "corrupt model must be fatal");
    }

    /// Injected detectors are exposed unchanged
    #[test]
    fn test_manager_from_detector() {
        let manager = VisionModelManager::from_detector(Arc::new(BrightRegionDetector::new()));

        let info = manager.model_info();
        assert_eq!(info.name, "bright-region");
        assert_eq!(info.num_classes, 1);
        assert_eq!(manager.detector().class_names().label(0), "calculo");
    }
}
