// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding and non-maximum suppression
//!
//! Two output layouts are understood:
//! - raw head `[1, 4 + nc, N]`: `cx, cy, w, h` followed by one score per class
//! - end-to-end `[1, N, 6]`: `x1, y1, x2, y2, score, class`, already suppressed

use ndarray::{ArrayView3, ArrayViewD, Ix3};
use std::cmp::Ordering;
use tracing::debug;

use super::errors::InferenceError;
use super::preprocessing::LetterboxInfo;
use super::types::RawDetection;

/// Ultralytics `predict` defaults
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;

/// Filtering applied to raw model predictions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessConfig {
    /// Candidates scoring below this are dropped
    pub confidence_threshold: f32,
    /// Same-class boxes overlapping more than this are suppressed
    pub iou_threshold: f32,
    /// Upper bound on returned detections
    pub max_detections: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputLayout {
    RawHead { num_classes: usize },
    EndToEnd,
}

/// A raw head always has fewer channels than anchors, which rules out the
/// transposed `[1, N, 4 + nc]` layout.
fn classify_layout(shape: &[usize]) -> Result<OutputLayout, InferenceError> {
    match shape {
        [1, _, 6] => Ok(OutputLayout::EndToEnd),
        [1, channels, anchors] if *channels > 4 && channels < anchors => {
            Ok(OutputLayout::RawHead {
                num_classes: channels - 4,
            })
        }
        _ => Err(InferenceError::InvalidOutput(format!(
            "unsupported detector output shape {:?}, expected [1, 4+nc, N] or [1, N, 6]",
            shape
        ))),
    }
}

/// Turn a detector output tensor into detections in original image pixels
///
/// Raw-head results are ordered by descending confidence after NMS.
/// End-to-end rows keep the order the model emitted them in.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    letterbox: &LetterboxInfo,
    config: &PostprocessConfig,
) -> Result<Vec<RawDetection>, InferenceError> {
    let layout = classify_layout(output.shape())?;
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?;

    let candidates = match layout {
        OutputLayout::RawHead { num_classes } => {
            let candidates = decode_raw_head(output, num_classes, config.confidence_threshold);
            debug!(
                "{} candidates above {:.2} from {} anchors",
                candidates.len(),
                config.confidence_threshold,
                output.shape()[2]
            );
            non_maximum_suppression(candidates, config.iou_threshold, config.max_detections)
        }
        OutputLayout::EndToEnd => {
            let mut candidates = decode_end_to_end(output, config.confidence_threshold)?;
            candidates.truncate(config.max_detections);
            candidates
        }
    };

    Ok(candidates
        .into_iter()
        .map(|c| RawDetection {
            bbox: letterbox.to_original(c.bbox),
            ..c
        })
        .collect())
}

fn decode_raw_head(
    output: ArrayView3<f32>,
    num_classes: usize,
    confidence_threshold: f32,
) -> Vec<RawDetection> {
    let num_anchors = output.shape()[2];
    let mut candidates = Vec::new();

    for i in 0..num_anchors {
        let mut best_score = f32::MIN;
        let mut best_class = 0;
        for c in 0..num_classes {
            let score = output[[0, 4 + c, i]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < confidence_threshold {
            continue;
        }

        let cx = output[[0, 0, i]];
        let cy = output[[0, 1, i]];
        let w = output[[0, 2, i]];
        let h = output[[0, 3, i]];

        candidates.push(RawDetection {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence: best_score,
            class_id: best_class,
        });
    }

    candidates
}

fn decode_end_to_end(
    output: ArrayView3<f32>,
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>, InferenceError> {
    let mut detections = Vec::new();

    for row in output.index_axis(ndarray::Axis(0), 0).rows() {
        let score = row[4];
        if score < confidence_threshold {
            continue;
        }

        let class = row[5];
        if !class.is_finite() || class < 0.0 {
            return Err(InferenceError::InvalidOutput(format!(
                "invalid class index {class}"
            )));
        }

        detections.push(RawDetection {
            bbox: [row[0], row[1], row[2], row[3]],
            confidence: score,
            class_id: class.round() as usize,
        });
    }

    Ok(detections)
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy per-class NMS, returning survivors by descending confidence
pub fn non_maximum_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    // Stable sort keeps anchor order among equal scores
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if keep.len() >= max_detections {
            break;
        }

        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });

        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}
