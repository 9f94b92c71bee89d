// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request helpers shared by the upload and lookup handlers

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::debug;
use uuid::Uuid;

use super::errors::ApiError;
use crate::analysis::service::DEFAULT_FILENAME;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// The `file` part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Pull the `file` field out of a multipart body
///
/// Other fields are skipped. A missing field is a 400; a body over the
/// configured limit is a 413.
pub async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::InvalidRequest(format!("Expected multipart form data: {}", e)))?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e.status(), e.body_text(), max_bytes)),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e.status(), e.body_text(), max_bytes))?;

        debug!(
            "Received upload '{}' ({}, {} bytes)",
            filename,
            content_type,
            bytes.len()
        );
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::ValidationError {
        field: FILE_FIELD.to_string(),
        message: "No file uploaded".to_string(),
    })
}

fn multipart_error(status: StatusCode, text: String, max_bytes: usize) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { max_bytes }
    } else {
        ApiError::InvalidRequest(format!("Malformed multipart body: {}", text))
    }
}

/// Parse a UUID path segment
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::ValidationError {
        field: what.to_string(),
        message: format!("Invalid {}: '{}'", what, raw),
    })
}
