// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the decode-then-detect pipeline

use thiserror::Error;

use crate::vision::image_utils::DecodeError;

/// The detector failed on a structurally valid image
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model runtime error: {0}")]
    Runtime(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),

    #[error("Model session is unavailable after a panic during inference")]
    SessionPoisoned,
}

/// Failure of a full request pipeline
///
/// The two variants are never conflated: `Decode` is the caller's fault,
/// `Inference` is ours.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Decode(_))
    }
}
