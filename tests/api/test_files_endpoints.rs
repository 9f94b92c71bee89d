// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Upload, file listing and background analysis tests

use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use visionflow_server::api::http_server::AppState;
use visionflow_server::config::ServerConfig;

use super::support::*;

async fn upload(state: &AppState) -> serde_json::Value {
    let (status, json) = send_json(
        app(state),
        upload_request("/api/upload", "parked.png", "image/png", &png_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "upload failed: {}", json);
    json
}

/// Poll until the background task leaves `processing`
async fn wait_for_analysis(state: &AppState, file_id: &str) -> (StatusCode, serde_json::Value) {
    let uri = format!("/api/analysis/{}", file_id);
    for _ in 0..200 {
        let (status, json) = send_json(app(state), get(&uri)).await;
        if status != StatusCode::OK || json["status"] != "processing" {
            return (status, json);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analysis for {} never finished", file_id);
}

#[tokio::test]
async fn test_upload_returns_receipt() {
    let state = state_with_stub();
    let receipt = upload(&state).await;

    assert_eq!(receipt["filename"], "parked.png");
    assert_eq!(receipt["file_type"], "image/png");
    assert_eq!(receipt["size"], png_bytes().len() as u64);
    assert!(Uuid::parse_str(receipt["file_id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        upload_request("/api/upload", "doc.pdf", "application/pdf", b"%PDF-1.4"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Only image files are supported");
}

#[tokio::test]
async fn test_list_files_tracks_analysis() {
    let state = state_with_stub();
    let receipt = upload(&state).await;

    let (status, json) = send_json(app(&state), get("/api/files")).await;
    assert_eq!(status, StatusCode::OK);
    let files = json.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["id"], receipt["file_id"]);
    assert_eq!(files[0]["analyzed"], false);
    assert!(files[0].get("image_data").is_none());
}

#[tokio::test]
async fn test_background_analysis_flow() {
    let state = state_with_stub();
    let receipt = upload(&state).await;
    let file_id = receipt["file_id"].as_str().unwrap();

    let (status, json) = send_json(app(&state), post(&format!("/api/analyze/{}", file_id))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "processing");
    assert_eq!(json["file_id"], receipt["file_id"]);

    let (status, json) = wait_for_analysis(&state, file_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "done");
    assert_eq!(json["result"]["file_id"], receipt["file_id"]);
    assert_eq!(json["result"]["total_objects"], 2);

    let (_, files) = send_json(app(&state), get("/api/files")).await;
    assert_eq!(files[0]["analyzed"], true);
}

#[tokio::test]
async fn test_background_analysis_failure() {
    let state = state_with_config(ServerConfig::for_test(), Arc::new(FailingDetector));
    let receipt = upload(&state).await;
    let file_id = receipt["file_id"].as_str().unwrap();

    let (status, _) = send_json(app(&state), post(&format!("/api/analyze/{}", file_id))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, json) = wait_for_analysis(&state, file_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert!(json["detail"].as_str().unwrap().contains("onnx session crashed"));
}

#[tokio::test]
async fn test_analyze_unknown_file() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        post(&format!("/api/analyze/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "File not found");
}

#[tokio::test]
async fn test_status_for_unknown_file() {
    let state = state_with_stub();
    let (status, _) = send_json(
        app(&state),
        get(&format!("/api/analysis/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_after_detect() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let file_id = analysis["file_id"].as_str().unwrap();

    let (status, json) = send_json(app(&state), get(&format!("/api/analysis/{}", file_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "done");
    assert_eq!(json["result"]["id"], analysis["id"]);
}

#[tokio::test]
async fn test_delete_file_cascades() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let file_id = analysis["file_id"].as_str().unwrap();
    let analysis_id = analysis["id"].as_str().unwrap();

    let (status, json) = send_json(app(&state), delete(&format!("/api/files/{}", file_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);

    let (status, _) = send_json(app(&state), get(&format!("/api/analyses/{}", analysis_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(app(&state), delete(&format!("/api/files/{}", file_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_file_id() {
    let state = state_with_stub();
    let (status, json) = send_json(app(&state), post("/api/analyze/12345")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "file_id");
}

#[tokio::test]
async fn test_repeated_analyze_is_accepted() {
    let state = state_with_stub();
    let receipt = upload(&state).await;
    let file_id = receipt["file_id"].as_str().unwrap();
    let uri = format!("/api/analyze/{}", file_id);

    for _ in 0..2 {
        let (status, json) = send_json(app(&state), post(&uri)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["status"], "processing");
    }

    let (status, json) = wait_for_analysis(&state, file_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "done");
}
