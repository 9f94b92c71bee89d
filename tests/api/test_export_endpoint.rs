// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Export endpoint tests
//!
//! These tests verify that:
//! - Exports come back as ZIP attachments named after the analysis
//! - Each format writes its annotation files next to the original image
//! - Unknown formats and analyses are rejected
//! - Every successful export is recorded

use axum::http::{header, StatusCode};
use std::io::{Cursor, Read};
use uuid::Uuid;

use super::support::*;

fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

fn zip_text(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

#[tokio::test]
async fn test_yolo_export_is_zip_attachment() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    let (status, headers, body) = send(
        app(&state),
        post(&format!("/api/export/{}?format=yolo", id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=export_{}.zip", id).as_str()
    );
    assert_eq!(
        zip_entries(&body),
        vec!["classes.txt", "street.png", "street.txt"]
    );

    // person [8,8,40,32] in a 64x48 image
    let labels = zip_text(&body, "street.txt");
    let first = labels.lines().next().unwrap();
    assert_eq!(first, "0 0.375000 0.416667 0.500000 0.500000");
    assert_eq!(labels.lines().count(), 2);

    let classes = zip_text(&body, "classes.txt");
    assert_eq!(classes.lines().collect::<Vec<_>>(), vec!["person", "bicycle", "car"]);
}

#[tokio::test]
async fn test_default_format_is_yolo() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    let (status, _headers, body) = send(app(&state), get(&format!("/api/export/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(zip_entries(&body).contains(&"street.txt".to_string()));
}

#[tokio::test]
async fn test_coco_export() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    let (status, _headers, body) = send(
        app(&state),
        get(&format!("/api/export/{}?format=coco", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(zip_entries(&body), vec!["annotations.json", "street.png"]);

    let doc: serde_json::Value = serde_json::from_str(&zip_text(&body, "annotations.json")).unwrap();
    assert_eq!(doc["images"][0]["width"], 64);
    assert_eq!(doc["annotations"].as_array().unwrap().len(), 2);
    assert_eq!(doc["annotations"][0]["bbox"], serde_json::json!([8.0, 8.0, 32.0, 24.0]));
    let category_ids: Vec<u64> = doc["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect();
    assert_eq!(category_ids, vec![1, 3]);
}

#[tokio::test]
async fn test_json_export() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    let (status, _headers, body) = send(
        app(&state),
        post(&format!("/api/export/{}?format=json", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let doc: serde_json::Value = serde_json::from_str(&zip_text(&body, "street.json")).unwrap();
    assert_eq!(doc["id"], analysis["id"]);
    assert!(doc.get("image_data").is_none());
}

#[tokio::test]
async fn test_unknown_format() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    let (status, json) = send_json(
        app(&state),
        post(&format!("/api/export/{}?format=voc", id)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "unsupported_format");
    assert!(state.store.list_exports(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_analysis() {
    let state = state_with_stub();
    let (status, json) = send_json(
        app(&state),
        post(&format!("/api/export/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Analysis not found");
}

#[tokio::test]
async fn test_exports_are_recorded() {
    let state = state_with_stub();
    let analysis = detect(&state, "street.png").await;
    let id = analysis["id"].as_str().unwrap();

    send(app(&state), post(&format!("/api/export/{}?format=coco", id))).await;

    let (status, json) = send_json(app(&state), get("/api/exports")).await;
    assert_eq!(status, StatusCode::OK);
    let exports = json.as_array().unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0]["analysis_id"], analysis["id"]);
    assert_eq!(exports[0]["file_id"], analysis["file_id"]);
    assert_eq!(exports[0]["format"], "coco");
    assert_eq!(
        exports[0]["download_url"],
        format!("/api/export/{}?format=coco", id)
    );
}
