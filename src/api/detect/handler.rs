// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, info};

use crate::analysis::AnalysisResult;
use crate::api::errors::ApiError;
use crate::api::extract::read_upload;
use crate::api::http_server::AppState;

/// POST /api/detect - Detect objects in an uploaded image
///
/// Accepts a multipart form with a `file` field, runs the YOLOv8 detector and
/// stores both the upload and the analysis.
///
/// # Response
/// - `id`: Analysis id, usable with `/api/analyses/{id}` and `/api/export/{id}`
/// - `file_id`: Stored upload id
/// - `image_data`: Base64 JPEG with boxes drawn
/// - `detections`: Boxes in original image pixels, with class and colour
/// - `processing_time`: Inference time in seconds
///
/// # Errors
/// - 400 Bad Request: No file, non-image content type or undecodable image
/// - 413 Payload Too Large: Upload over the configured limit
/// - 503 Service Unavailable: Detection model not loaded
/// - 500 Internal Server Error: Inference or storage failed
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let limits = state.analysis.limits();
    let upload = read_upload(multipart, limits.max_upload_bytes).await?;
    debug!("Detect request for {}", upload.filename);

    let analysis = state
        .analysis
        .detect_and_store(&upload.filename, &upload.content_type, &upload.bytes)
        .await?;

    info!(
        "Detected {} objects in {} ({:.3}s)",
        analysis.total_objects, analysis.filename, analysis.processing_time
    );
    Ok(Json(analysis))
}
