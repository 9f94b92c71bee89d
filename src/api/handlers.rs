// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Root, health and status-check handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::ApiError;
use super::http_server::AppState;
use crate::storage::StatusCheck;
use crate::version::VERSION_NUMBER;
use crate::vision::DetectorModelInfo;

pub const ROOT_MESSAGE: &str = "VisionFlow API - YOLOv8 Object Detection Service";

/// Status checks returned by `GET /api/status`
const STATUS_CHECK_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub version: String,
    pub models: Vec<DetectorModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCheckCreate {
    pub client_name: String,
}

/// GET /api/
pub async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": ROOT_MESSAGE }))
}

/// GET /health
///
/// `degraded` when the model is not loaded or the database does not answer.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut issues = Vec::new();

    let model_loaded = state.detectors.has_detector();
    if !model_loaded {
        issues.push("Detection model not loaded".to_string());
    }
    if let Err(e) = state.store.call(|store| store.ping()).await {
        warn!("Database health check failed: {}", e);
        issues.push("Database unavailable".to_string());
    }

    Json(HealthResponse {
        status: if issues.is_empty() { "healthy" } else { "degraded" }.to_string(),
        model_loaded,
        version: VERSION_NUMBER.to_string(),
        models: state.detectors.list_models(),
        issues: if issues.is_empty() { None } else { Some(issues) },
    })
}

/// POST /api/status
pub async fn create_status_check_handler(
    State(state): State<AppState>,
    payload: Result<Json<StatusCheckCreate>, JsonRejection>,
) -> Result<Json<StatusCheck>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let client_name = request.client_name.trim();
    if client_name.is_empty() {
        return Err(ApiError::ValidationError {
            field: "client_name".to_string(),
            message: "client_name must not be empty".to_string(),
        });
    }

    let check = StatusCheck::new(client_name);
    let check = state
        .store
        .call(move |store| {
            store.insert_status_check(&check)?;
            Ok(check)
        })
        .await?;
    debug!("Status check from {}", check.client_name);
    Ok(Json(check))
}

/// GET /api/status
pub async fn list_status_checks_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusCheck>>, ApiError> {
    Ok(Json(
        state
            .store
            .call(|store| store.list_status_checks(STATUS_CHECK_LIMIT))
            .await?,
    ))
}
