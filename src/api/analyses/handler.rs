// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis history handlers

use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use super::response::DeleteResponse;
use crate::analysis::AnalysisResult;
use crate::api::errors::ApiError;
use crate::api::extract::parse_id;
use crate::api::http_server::AppState;

/// GET /api/analyses - Newest analyses first, capped at the history limit
pub async fn list_analyses_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnalysisResult>>, ApiError> {
    Ok(Json(state.analysis.recent_analyses().await?))
}

/// GET /api/analyses/{id}
pub async fn get_analysis_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let id = parse_id(&id, "analysis_id")?;
    state
        .store
        .call(move |store| store.get_analysis(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))
}

/// DELETE /api/analyses/{id} - Remove an analysis and its detections
///
/// The uploaded file is kept.
pub async fn delete_analysis_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id, "analysis_id")?;
    if !state.store.call(move |store| store.delete_analysis(id)).await? {
        return Err(ApiError::NotFound("Analysis not found".to_string()));
    }
    info!("Deleted analysis {}", id);
    Ok(Json(DeleteResponse::new(id)))
}
