// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detector backed by ONNX Runtime
//!
//! Loads an Ultralytics ONNX export and runs it on CPU. Class names and the
//! input size are read from the metadata the exporter embeds in the model.

use anyhow::{Context, Result};
use image::RgbImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::class_names::ClassNames;
use super::errors::InferenceError;
use super::postprocessing::{
    decode_predictions, PostprocessConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD,
    DEFAULT_MAX_DETECTIONS,
};
use super::preprocessing::{preprocess_for_detection, DEFAULT_INPUT_SIZE};
use super::types::{DetectorMetadata, RawDetection};

/// A model that finds objects in an RGB image
///
/// Implementations return boxes in original image pixels in the order the
/// model ranks them.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Run detection on one image
    fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, InferenceError>;

    /// Class index to name mapping
    fn class_names(&self) -> &ClassNames;

    /// Static facts about the model
    fn metadata(&self) -> DetectorMetadata;
}

/// Runtime settings for the ONNX detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Overrides the input size from model metadata
    pub input_size: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            intra_threads: 4,
            input_size: None,
        }
    }
}

impl DetectorConfig {
    pub fn postprocess(&self) -> PostprocessConfig {
        PostprocessConfig {
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}

/// YOLO detector running an Ultralytics ONNX export
///
/// The session sits behind a mutex since `Session::run` needs exclusive
/// access; concurrent requests serialize on it.
#[derive(Clone)]
pub struct OnnxYoloDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    model_name: String,
    input_size: u32,
    class_names: ClassNames,
    config: DetectorConfig,
}

impl std::fmt::Debug for OnnxYoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxYoloDetector")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("num_classes", &self.class_names.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OnnxYoloDetector {
    /// Load a detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime cannot build a session from the file
    pub fn new<P: AsRef<Path>>(model_path: P, config: DetectorConfig) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load detection model from {}", model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let (class_names, metadata_imgsz) = read_ultralytics_metadata(&session);
        let input_size = config
            .input_size
            .or(metadata_imgsz)
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let model_name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo".to_string());

        debug!(
            "Detection model input: {}, size: {}, classes: {}",
            input_name,
            input_size,
            class_names.len()
        );
        info!("✅ Detection model {} loaded (CPU-only)", model_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
            input_size,
            class_names,
            config,
        })
    }

    /// Replace the class names read from model metadata
    pub fn with_class_names(mut self, class_names: ClassNames) -> Self {
        self.class_names = class_names;
        self
    }

}

impl ObjectDetector for OnnxYoloDetector {
    fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, InferenceError> {
        let (input, letterbox) = preprocess_for_detection(image, self.input_size);

        let input_value = Value::from_array(input)
            .map_err(|e| InferenceError::Runtime(format!("failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::SessionPoisoned)?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| InferenceError::Runtime(format!("inference failed: {e}")))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("failed to extract output tensor: {e}")))?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        decode_predictions(output_tensor.view(), &letterbox, &self.config.postprocess())
    }

    fn class_names(&self) -> &ClassNames {
        &self.class_names
    }

    fn metadata(&self) -> DetectorMetadata {
        DetectorMetadata {
            name: self.model_name.clone(),
            input_size: self.input_size,
            num_classes: self.class_names.len(),
        }
    }
}

/// Read `names` and `imgsz` from Ultralytics custom metadata
///
/// Missing or malformed entries are logged and skipped.
fn read_ultralytics_metadata(session: &Session) -> (ClassNames, Option<u32>) {
    let metadata = match session.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to read model metadata: {}", e);
            return (ClassNames::default(), None);
        }
    };

    let class_names = match metadata.custom("names") {
        Ok(Some(raw)) => ClassNames::from_ultralytics_metadata(&raw).unwrap_or_else(|e| {
            warn!("Ignoring malformed class names in model metadata: {}", e);
            ClassNames::default()
        }),
        Ok(None) => {
            warn!("Model metadata has no class names, labels will be class indices");
            ClassNames::default()
        }
        Err(e) => {
            warn!("Failed to read class names from model metadata: {}", e);
            ClassNames::default()
        }
    };

    let imgsz = match metadata.custom("imgsz") {
        Ok(Some(raw)) => parse_imgsz(&raw),
        _ => None,
    };

    (class_names, imgsz)
}

/// Parse `imgsz` metadata such as `[640, 640]` or `640`
///
/// Only square inputs are supported, so the first dimension wins.
fn parse_imgsz(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .next()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|size| *size > 0)
}
