// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /detect/ for running the YOLO detector on an uploaded image.

pub mod handler;
pub mod request;

pub use handler::detect_handler;
pub use request::{DetectUpload, FILE_FIELD};
