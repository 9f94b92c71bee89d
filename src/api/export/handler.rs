// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Export endpoint handlers

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::request::ExportQuery;
use crate::api::errors::ApiError;
use crate::api::extract::parse_id;
use crate::api::http_server::AppState;
use crate::export::build_export;
use crate::storage::ExportRecord;

/// GET|POST /api/export/{id}?format=yolo|coco|json
///
/// Streams a ZIP with the original image and annotation files in the
/// requested format, and records the export.
///
/// # Errors
/// - 400 Bad Request: Malformed id or unknown format
/// - 404 Not Found: Unknown analysis
/// - 500 Internal Server Error: Archive could not be built
pub async fn export_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let analysis_id = parse_id(&id, "analysis_id")?;
    let format = query.format()?;

    let (analysis, original) = state
        .store
        .call(move |store| {
            let Some(analysis) = store.get_analysis(analysis_id)? else {
                return Ok(None);
            };
            let original = store.get_file_image(analysis.file_id)?;
            Ok(Some((analysis, original)))
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))?;
    if original.is_none() {
        debug!(
            "No original image for file {}, exporting annotated image",
            analysis.file_id
        );
    }

    let package = build_export(&analysis, original.as_deref(), format)?;

    let record = ExportRecord {
        id: Uuid::new_v4(),
        analysis_id,
        file_id: analysis.file_id,
        format: format.to_string(),
        download_url: Some(format!("/api/export/{}?format={}", analysis_id, format)),
        created_at: Utc::now(),
    };
    state
        .store
        .call(move |store| store.insert_export(&record))
        .await?;

    info!(
        "Exported analysis {} as {} ({} bytes)",
        analysis_id,
        format,
        package.bytes.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", package.filename),
            ),
        ],
        package.bytes,
    )
        .into_response())
}

/// GET /api/exports - Recorded exports, newest first
pub async fn list_exports_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExportRecord>>, ApiError> {
    let limit = state.analysis.limits().history_limit;
    Ok(Json(state.store.call(move |store| store.list_exports(limit)).await?))
}
