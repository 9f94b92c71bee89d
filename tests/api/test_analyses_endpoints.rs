// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Analysis history endpoint tests

use axum::http::StatusCode;
use uuid::Uuid;

use super::support::*;

#[tokio::test]
async fn test_list_analyses_newest_first() {
    let state = state_with_stub();
    let first = detect(&state, "first.png").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = detect(&state, "second.png").await;

    let (status, json) = send_json(app(&state), get("/api/analyses")).await;
    assert_eq!(status, StatusCode::OK);

    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[1]["id"], first["id"]);
    assert_eq!(list[0]["detections"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_analyses_empty() {
    let state = state_with_stub();
    let (status, json) = send_json(app(&state), get("/api/analyses")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_get_analysis_by_id() {
    let state = state_with_stub();
    let created = detect(&state, "street.png").await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send_json(app(&state), get(&format!("/api/analyses/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], created["id"]);
    assert_eq!(json["detections"], created["detections"]);
}

#[tokio::test]
async fn test_get_unknown_analysis() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        get(&format!("/api/analyses/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Analysis not found");
}

#[tokio::test]
async fn test_malformed_analysis_id() {
    let state = state_with_stub();
    let (status, json) = send_json(app(&state), get("/api/analyses/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "analysis_id");
}

#[tokio::test]
async fn test_delete_analysis() {
    let state = state_with_stub();
    let created = detect(&state, "street.png").await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/analyses/{}", id);

    let (status, json) = send_json(app(&state), delete(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], true);
    assert_eq!(json["id"], created["id"]);

    let (status, _) = send_json(app(&state), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(app(&state), delete(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
