// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detection
//!
//! - `model`: ONNX Runtime detector and the `ObjectDetector` seam
//! - `preprocessing` / `postprocessing`: letterbox in, NMS out
//! - `adapter`: raw candidates to labelled `Detection` records

pub mod adapter;
pub mod class_names;
pub mod errors;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod types;

pub use adapter::DetectionAdapter;
pub use class_names::{ClassNames, ClassNamesError};
pub use errors::{InferenceError, PipelineError};
pub use model::{DetectorConfig, ObjectDetector, OnnxYoloDetector};
pub use postprocessing::{decode_predictions, iou, non_maximum_suppression, PostprocessConfig};
pub use preprocessing::{letterbox, preprocess_for_detection, LetterboxInfo};
pub use types::{Detection, DetectionResponse, DetectorMetadata, RawDetection};
