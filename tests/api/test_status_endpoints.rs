// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Root, health and status-check endpoint tests

use axum::http::StatusCode;
use visionflow_server::api::ROOT_MESSAGE;

use super::support::*;

#[tokio::test]
async fn test_root_message() {
    let state = state_with_stub();
    for uri in ["/api", "/api/"] {
        let (status, json) = send_json(app(&state), get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(json["message"], ROOT_MESSAGE);
    }
}

#[tokio::test]
async fn test_health_with_model() {
    let state = state_with_stub();
    let (status, json) = send_json(app(&state), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], true);
    assert_eq!(json["version"], visionflow_server::version::VERSION_NUMBER);
    assert_eq!(json["models"][0]["name"], "stub-yolo");
    assert!(json.get("issues").is_none());
}

#[tokio::test]
async fn test_health_without_model_is_degraded() {
    let state = state_without_model();
    let (status, json) = send_json(app(&state), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["issues"][0], "Detection model not loaded");
}

#[tokio::test]
async fn test_status_checks_roundtrip() {
    let state = state_with_stub();

    let (status, created) = send_json(
        app(&state),
        post_json("/api/status", serde_json::json!({"client_name": "dashboard"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["client_name"], "dashboard");
    assert!(created["id"].is_string());
    assert!(created["timestamp"].is_string());

    send_json(
        app(&state),
        post_json("/api/status", serde_json::json!({"client_name": "mobile"})),
    )
    .await;

    let (status, json) = send_json(app(&state), get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["client_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["dashboard", "mobile"]);
}

#[tokio::test]
async fn test_status_check_validation() {
    let state = state_with_stub();

    let (status, json) = send_json(
        app(&state),
        post_json("/api/status", serde_json::json!({"client_name": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "client_name");

    let (status, json) = send_json(
        app(&state),
        post_json("/api/status", serde_json::json!({"name": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_unknown_route() {
    let state = state_with_stub();
    let (status, _headers, _body) = send(app(&state), get("/api/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
