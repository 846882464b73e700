// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::request::{DetectUpload, FILE_FIELD};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::detection::DetectionResponse;

/// POST /detect/ - Detect objects in an uploaded image
///
/// # Request
/// `multipart/form-data` with the image in a part named `file`.
///
/// # Response
/// - `filename`: the part's filename, echoed back
/// - `detections`: `{label, confidence, bbox: [x1, y1, x2, y2]}` per object
///
/// # Errors
/// - 400 Bad Request: missing `file` part, or bytes that are not an image
/// - 413 Payload Too Large: upload exceeds the configured limit
/// - 500 Internal Server Error: the detector failed
pub async fn detect_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Detect request is not multipart: {}", rejection.body_text());
        ApiError::ValidationError {
            field: FILE_FIELD.to_string(),
            message: rejection.body_text(),
        }
    })?;

    let upload = DetectUpload::from_multipart(&mut multipart)
        .await
        .inspect_err(|e| warn!("Detect upload rejected: {}", e))?;

    debug!(
        "Detect request received: {:?} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    // Decode and inference are CPU-bound
    let service = state.detection_service.clone();
    let result = tokio::task::spawn_blocking(move || {
        service.process(&upload.bytes, &upload.filename)
    })
    .await
    .map_err(|e| {
        error!("Detection task failed: {}", e);
        ApiError::InternalError("Detection task failed".to_string())
    })?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_client_error() => {
            warn!("Rejected upload: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Detection failed: {}", e);
            Err(e.into())
        }
    }
}
