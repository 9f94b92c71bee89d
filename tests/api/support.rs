// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures for the HTTP tests
#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`
use visionflow_server::{
    api::http_server::{create_app, AppState},
    config::ServerConfig,
    storage::Store,
    vision::{BoundingBox, DetectorManager, ObjectDetection, ObjectDetector},
};

const BOUNDARY: &str = "visionflow-test-boundary";

/// Detector returning a fixed person and car
pub struct StubDetector;

impl ObjectDetector for StubDetector {
    fn model_name(&self) -> String {
        "stub-yolo".to_string()
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<ObjectDetection>> {
        Ok(vec![
            ObjectDetection {
                class_id: 0,
                confidence: 0.91,
                bbox: BoundingBox { x1: 8.0, y1: 8.0, x2: 40.0, y2: 32.0 },
            },
            ObjectDetection {
                class_id: 2,
                confidence: 0.72,
                bbox: BoundingBox { x1: 30.0, y1: 10.0, x2: 60.0, y2: 40.0 },
            },
        ])
    }
}

/// Detector whose inference always fails
pub struct FailingDetector;

impl ObjectDetector for FailingDetector {
    fn model_name(&self) -> String {
        "failing".to_string()
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<ObjectDetection>> {
        anyhow::bail!("onnx session crashed")
    }
}

pub fn state_with_stub() -> AppState {
    AppState::new_for_test(Some(Arc::new(StubDetector))).unwrap()
}

pub fn state_without_model() -> AppState {
    AppState::new_for_test(None).unwrap()
}

pub fn state_with_config(config: ServerConfig, detector: Arc<dyn ObjectDetector>) -> AppState {
    AppState::new(
        config,
        Arc::new(Store::open_in_memory().unwrap()),
        DetectorManager::with_detector(detector),
    )
}

pub fn app(state: &AppState) -> Router {
    create_app(state.clone())
}

/// 64x48 grey PNG
pub fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, image::Rgb([120, 130, 140])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, field, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn upload_request(uri: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    multipart_request(uri, "file", filename, content_type, bytes)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _headers, body) = send(app, request).await;
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Run `/api/detect` with the stub image and return the analysis JSON
pub async fn detect(state: &AppState, filename: &str) -> serde_json::Value {
    let (status, json) = send_json(
        app(state),
        upload_request("/api/detect", filename, "image/png", &png_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "detect failed: {}", json);
    json
}
