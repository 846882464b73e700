// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the object detector at startup

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::detection::{
    ClassNames, DetectorConfig, DetectorMetadata, ObjectDetector, OnnxYoloDetector,
};

/// Configuration for loading the detection model
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Optional labels file overriding the names embedded in the model
    pub labels_path: Option<PathBuf>,
    /// Runtime settings passed to the detector
    pub detector: DetectorConfig,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best-calculo-peso.onnx"),
            labels_path: None,
            detector: DetectorConfig::default(),
        }
    }
}

/// Owns the process-wide detector
///
/// The model is loaded once, before the server accepts requests. A model
/// that fails to load is fatal.
pub struct VisionModelManager {
    detector: Arc<dyn ObjectDetector>,
}

impl VisionModelManager {
    /// Load the detector described by `config`
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let VisionModelConfig {
            model_path,
            labels_path,
            detector: detector_config,
        } = config;

        // Session creation parses and optimizes the graph, keep it off the runtime threads
        let detector = tokio::task::spawn_blocking(move || -> anyhow::Result<OnnxYoloDetector> {
            let detector = OnnxYoloDetector::new(&model_path, detector_config)?;
            match labels_path {
                Some(path) => {
                    let names = ClassNames::from_labels_file(&path)?;
                    tracing::info!("Loaded {} class names from {}", names.len(), path.display());
                    Ok(detector.with_class_names(names))
                }
                None => Ok(detector),
            }
        })
        .await
        .context("Model loading task panicked")??;

        tracing::info!("✅ Detection model ready: {:?}", detector);

        Ok(Self {
            detector: Arc::new(detector),
        })
    }

    /// Wrap an already constructed detector
    pub fn from_detector(detector: Arc<dyn ObjectDetector>) -> Self {
        Self { detector }
    }

    /// Get the shared detector
    pub fn detector(&self) -> Arc<dyn ObjectDetector> {
        self.detector.clone()
    }

    /// Describe the loaded model
    pub fn model_info(&self) -> DetectorMetadata {
        self.detector.metadata()
    }
}
