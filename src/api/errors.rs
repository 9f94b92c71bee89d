// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, warn};

use crate::analysis::AnalysisError;
use crate::export::ExportError;
use crate::storage::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    PayloadTooLarge {
        max_bytes: usize,
    },
    UnsupportedFormat {
        format: String,
        supported: Vec<String>,
    },
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, detail, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::PayloadTooLarge { max_bytes } => {
                let mut details = HashMap::new();
                details.insert(
                    "max_bytes".to_string(),
                    serde_json::Value::Number((*max_bytes).into()),
                );
                (
                    "payload_too_large",
                    format!("File too large (max {} bytes)", max_bytes),
                    Some(details),
                )
            }
            ApiError::UnsupportedFormat { format, supported } => {
                let mut details = HashMap::new();
                details.insert(
                    "supported_formats".to_string(),
                    serde_json::Value::Array(
                        supported
                            .iter()
                            .map(|f| serde_json::Value::String(f.clone()))
                            .collect(),
                    ),
                );
                (
                    "unsupported_format",
                    format!("Unsupported export format '{}'", format),
                    Some(details),
                )
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            detail,
            error_type: error_type.to_string(),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::PayloadTooLarge { max_bytes } => {
                write!(f, "Payload too large (max {} bytes)", max_bytes)
            }
            ApiError::UnsupportedFormat { format, .. } => {
                write!(f, "Unsupported export format '{}'", format)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::UnsupportedMediaType(_) | AnalysisError::InvalidImage(_) => {
                ApiError::InvalidRequest(err.to_string())
            }
            AnalysisError::TooLarge { max, .. } => ApiError::PayloadTooLarge { max_bytes: max },
            AnalysisError::ModelUnavailable => ApiError::ServiceUnavailable(err.to_string()),
            AnalysisError::Inference(msg) => {
                ApiError::InternalError(format!("Error processing image: {}", msg))
            }
            AnalysisError::NotFound(msg) => ApiError::NotFound(msg),
            AnalysisError::Storage(e) => e.into(),
            AnalysisError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Database error: {}", err))
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat(format) => ApiError::UnsupportedFormat {
                format,
                supported: vec!["yolo".to_string(), "coco".to_string(), "json".to_string()],
            },
            ExportError::MissingImage(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::InternalError(format!("Error exporting analysis: {}", other)),
        }
    }
}
