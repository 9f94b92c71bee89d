// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cross-origin header tests
//!
//! These tests verify that:
//! - The default configuration allows any origin
//! - An origin allow-list echoes listed origins only
//! - Preflight requests are answered for listed origins

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use std::sync::Arc;
use visionflow_server::api::http_server::AppState;
use visionflow_server::config::ServerConfig;

use super::support::*;

const ALLOWED: &str = "http://dashboard.visionflow.test";
const OTHER: &str = "http://elsewhere.test";

fn restricted_state() -> AppState {
    let config = ServerConfig {
        cors_allowed_origins: vec![ALLOWED.to_string()],
        ..ServerConfig::for_test()
    };
    state_with_config(config, Arc::new(StubDetector))
}

fn get_from(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

fn preflight(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_default_allows_any_origin() {
    let state = state_with_stub();
    let (status, headers, _body) = send(app(&state), get_from("/health", OTHER)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_listed_origin_is_echoed() {
    let state = restricted_state();
    let (status, headers, _body) = send(app(&state), get_from("/health", ALLOWED)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
}

#[tokio::test]
async fn test_unlisted_origin_gets_no_header() {
    let state = restricted_state();
    let (status, headers, _body) = send(app(&state), get_from("/health", OTHER)).await;

    // The request is served; the browser enforces the missing header
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_preflight_for_listed_origin() {
    let state = restricted_state();
    let (status, headers, _body) = send(app(&state), preflight("/api/detect", ALLOWED)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));

    let (_status, headers, _body) = send(app(&state), preflight("/api/detect", OTHER)).await;
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
