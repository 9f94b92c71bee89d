// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection pipeline, persistence orchestration and background tasks

pub mod pipeline;
pub mod service;
pub mod tasks;
pub mod types;

use thiserror::Error;
use crate::storage::StoreError;

pub use pipeline::{analyze_image, is_image_content_type, run_detection, validate_upload};
pub use service::{AnalysisLimits, AnalysisService, AnalysisStatus, UploadReceipt};
pub use tasks::{TaskState, TaskTicket, TaskTracker};
pub use types::{AnalysisResult, Detection};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Only image files are supported")]
    UnsupportedMediaType(String),

    #[error("Invalid image format")]
    InvalidImage(String),

    #[error("Upload is too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Detection model not loaded")]
    ModelUnavailable,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
