// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect/ endpoint tests
//!
//! Run against `create_app` with deterministic detectors, so no model file
//! is needed.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`
use yolo_detection_api::api::http_server::{create_app, AppState};
use yolo_detection_api::vision::detection::{ClassNames, RawDetection};
use yolo_detection_api::vision::{DecoderLimits, DetectionService};

use crate::common::{
    app_with, encode_png, image_with_square, multipart_body, multipart_content_type,
    BrightRegionDetector, FailingDetector, FixedDetector,
};

fn detect_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[cfg(test)]
mod detect_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_detects_bright_square() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let png = encode_png(&image_with_square(64, 48, 10, 12, 8));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("x.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "x.png");
        let detections = json["detections"].as_array().unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0]["label"], "calculo");
        assert!((detections[0]["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        let bbox: Vec<f64> = detections[0]["bbox"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(bbox, vec![10.0, 12.0, 18.0, 20.0]);
    }

    #[tokio::test]
    async fn test_route_without_trailing_slash() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let png = encode_png(&image_with_square(16, 16, 0, 0, 4));

        let (status, json) = send(
            app,
            detect_request("/detect", multipart_body("file", Some("a.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "a.png");
    }

    #[tokio::test]
    async fn test_no_objects_returns_empty_list() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let png = encode_png(&image_with_square(640, 640, 0, 0, 0));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("black.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["detections"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_empty_upload_is_invalid_image() {
        let detector = Arc::new(BrightRegionDetector::new());
        let app = app_with(detector.clone());

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("empty.jpg"), &[])),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "invalid_image");
        assert_eq!(
            detector.calls.load(std::sync::atomic::Ordering::SeqCst),
            0,
            "detector must not run on undecodable input"
        );
    }

    #[tokio::test]
    async fn test_non_image_bytes_are_invalid_image() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));

        let (status, json) = send(
            app,
            detect_request(
                "/detect/",
                multipart_body("file", Some("notes.txt"), b"definitely not pixels"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "invalid_image");
    }

    #[tokio::test]
    async fn test_inference_failure_is_server_error() {
        let app = app_with(Arc::new(FailingDetector::new()));
        let png = encode_png(&image_with_square(16, 16, 2, 2, 4));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("x.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error_type"], "inference_error");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("simulated runtime failure"));
    }

    #[tokio::test]
    async fn test_missing_file_part() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let png = encode_png(&image_with_square(16, 16, 2, 2, 4));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("image", Some("x.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "validation_error");
        assert_eq!(json["details"]["field"], "file");
    }

    #[tokio::test]
    async fn test_non_multipart_body_rejected() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/detect/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"file": "x"}"#))
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "validation_error");
    }

    #[tokio::test]
    async fn test_missing_filename_echoes_empty_string() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let png = encode_png(&image_with_square(16, 16, 2, 2, 4));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", None, &png)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["filename"], "");
    }

    #[tokio::test]
    async fn test_unmapped_class_label_is_index() {
        let detector = FixedDetector {
            detections: vec![RawDetection {
                bbox: [1.0, 1.0, 4.0, 4.0],
                confidence: 0.6,
                class_id: 5,
            }],
            names: ClassNames::from_list(["calculo"]),
        };
        let app = app_with(Arc::new(detector));
        let png = encode_png(&image_with_square(8, 8, 0, 0, 0));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("x.png"), &png)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["detections"][0]["label"], "5");
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let limits = DecoderLimits {
            max_bytes: 1024,
            ..DecoderLimits::default()
        };
        let service = DetectionService::new(Arc::new(BrightRegionDetector::new()), limits);
        let app = create_app(Arc::new(AppState::new(Arc::new(service))));

        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("big.png"), &[0u8; 4096])),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error_type"], "payload_too_large");
    }

    #[tokio::test]
    async fn test_body_over_transport_limit_rejected() {
        let limits = DecoderLimits {
            max_bytes: 1024,
            ..DecoderLimits::default()
        };
        let detector = Arc::new(BrightRegionDetector::new());
        let service = DetectionService::new(detector.clone(), limits);
        let app = create_app(Arc::new(AppState::new(Arc::new(service))));

        // Larger than the decoder bound plus the 64 KiB multipart allowance
        let upload = vec![0u8; 1024 + 64 * 1024 + 16 * 1024];
        let (status, json) = send(
            app,
            detect_request("/detect/", multipart_body("file", Some("huge.png"), &upload)),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error_type"], "payload_too_large");
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));
        let request = Request::builder()
            .method(Method::GET)
            .uri("/detect/")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let app = app_with(Arc::new(BrightRegionDetector::new()));

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let png = encode_png(&image_with_square(64, 64, i * 4, i * 2, 6));
                let name = format!("img-{i}.png");
                let (status, json) = send(
                    app,
                    detect_request("/detect/", multipart_body("file", Some(&name), &png)),
                )
                .await;
                (i, status, json)
            }));
        }

        for handle in handles {
            let (i, status, json) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["filename"], format!("img-{i}.png"));
            assert_eq!(json["detections"][0]["bbox"][0].as_f64().unwrap(), (i * 4) as f64);
        }
    }
}
