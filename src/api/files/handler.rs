// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload and background analysis handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::debug;

use super::response::AnalyzeResponse;
use crate::analysis::{AnalysisStatus, UploadReceipt};
use crate::api::analyses::DeleteResponse;
use crate::api::errors::ApiError;
use crate::api::extract::{parse_id, read_upload};
use crate::api::http_server::AppState;
use crate::storage::FileSummary;

/// POST /api/upload - Store an image without analysing it
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let limits = state.analysis.limits();
    let upload = read_upload(multipart, limits.max_upload_bytes).await?;
    let receipt = state
        .analysis
        .upload(&upload.filename, &upload.content_type, &upload.bytes)
        .await?;
    Ok(Json(receipt))
}

/// GET /api/files - Uploaded files, newest first
pub async fn list_files_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let limit = state.analysis.limits().history_limit;
    Ok(Json(state.store.call(move |store| store.list_files(limit)).await?))
}

/// DELETE /api/files/{id} - Delete a file with its analyses and exports
pub async fn delete_file_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let file_id = parse_id(&id, "file_id")?;
    if !state.analysis.delete_file(file_id).await? {
        return Err(ApiError::NotFound("File not found".to_string()));
    }
    Ok(Json(DeleteResponse::new(file_id)))
}

/// POST /api/analyze/{file_id} - Analyse a stored upload in the background
///
/// Answers 202 straight away. Asking again while the task runs returns the
/// same acknowledgement without starting a second task.
pub async fn analyze_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), ApiError> {
    let file_id = parse_id(&id, "file_id")?;
    if !state.analysis.start_background_analysis(file_id).await? {
        debug!("Analysis for file {} already running", file_id);
    }
    Ok((StatusCode::ACCEPTED, Json(AnalyzeResponse::processing(file_id))))
}

/// GET /api/analysis/{file_id} - Progress or result of a file's analysis
pub async fn analysis_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisStatus>, ApiError> {
    let file_id = parse_id(&id, "file_id")?;
    state
        .analysis
        .analysis_status(file_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No analysis found for file".to_string()))
}
