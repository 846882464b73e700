// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction for the detect endpoint

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError};

use crate::api::errors::ApiError;

/// Name of the multipart part carrying the image
pub const FILE_FIELD: &str = "file";

/// The image part of a detect request
#[derive(Debug, Clone)]
pub struct DetectUpload {
    /// Client-supplied filename, empty when the part has none
    pub filename: String,
    /// Raw encoded image bytes
    pub bytes: Bytes,
}

impl DetectUpload {
    /// Read parts until the `file` part is found
    ///
    /// Other parts are skipped. The first `file` part wins.
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, ApiError> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;

            return Ok(Self { filename, bytes });
        }

        Err(ApiError::ValidationError {
            field: FILE_FIELD.to_string(),
            message: "file is required".to_string(),
        })
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::ValidationError {
            field: FILE_FIELD.to_string(),
            message: err.body_text(),
        }
    }
}
