// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /api/detect tests
//!
//! These tests verify that:
//! - A valid upload returns an analysis with mapped detections
//! - The upload and analysis are persisted
//! - Non-image, undecodable and missing uploads are 400s
//! - Oversized uploads are 413s
//! - A missing model is a 503

use axum::http::StatusCode;
use std::sync::Arc;
use uuid::Uuid;
use visionflow_server::config::ServerConfig;

use super::support::*;

#[tokio::test]
async fn test_detect_returns_analysis() {
    let state = state_with_stub();
    let json = detect(&state, "street.png").await;

    assert_eq!(json["filename"], "street.png");
    assert_eq!(json["file_type"], "image/png");
    assert_eq!(json["image_width"], 64);
    assert_eq!(json["image_height"], 48);
    assert_eq!(json["total_objects"], 2);

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections[0]["class_name"], "person");
    assert_eq!(detections[0]["color"], "#FF6B6B");
    assert_eq!(detections[1]["class_name"], "car");
    assert_eq!(detections[1]["color"], "#45B7D1");
    assert_eq!(detections[1]["bbox"], serde_json::json!([30.0, 10.0, 60.0, 40.0]));
    assert!(json["processing_time"].as_f64().unwrap() >= 0.0);
    assert!(!json["image_data"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_detect_persists_file_and_analysis() {
    let state = state_with_stub();
    let json = detect(&state, "street.png").await;

    let analysis_id = Uuid::parse_str(json["id"].as_str().unwrap()).unwrap();
    let file_id = Uuid::parse_str(json["file_id"].as_str().unwrap()).unwrap();

    let stored = state.store.get_analysis(analysis_id).unwrap().unwrap();
    assert_eq!(stored.detections.len(), 2);
    assert_eq!(state.store.get_file_image(file_id).unwrap().unwrap(), png_bytes());
}

#[tokio::test]
async fn test_detect_rejects_non_image() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/detect", "notes.txt", "text/plain", b"hello"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Only image files are supported");
    assert!(state.store.list_files(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_detect_rejects_corrupt_image() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/detect", "broken.png", "image/png", b"definitely not a png"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Invalid image format");
}

#[tokio::test]
async fn test_detect_requires_file_field() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        multipart_request("/api/detect", "attachment", "a.png", "image/png", &png_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "file");
}

#[tokio::test]
async fn test_detect_rejects_non_multipart_body() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        post_json("/api/detect", serde_json::json!({"image": "abc"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_detect_rejects_oversized_upload() {
    let config = ServerConfig {
        max_upload_bytes: 1024,
        ..ServerConfig::for_test()
    };
    let state = state_with_config(config, Arc::new(StubDetector));
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/detect", "big.png", "image/png", &vec![7u8; 4096]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error_type"], "payload_too_large");
    assert_eq!(json["details"]["max_bytes"], 1024);
}

#[tokio::test]
async fn test_detect_without_model() {
    let state = state_without_model();
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/detect", "a.png", "image/png", &png_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["detail"], "Detection model not loaded");
}

#[tokio::test]
async fn test_detect_inference_failure() {
    let state = state_with_config(ServerConfig::for_test(), Arc::new(FailingDetector));
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/detect", "a.png", "image/png", &png_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .contains("onnx session crashed"));
    assert!(state.store.list_analyses(10).unwrap().is_empty());
}
