// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    /// Upload content type
    pub filetype: String,
    /// Size of the original upload in bytes
    pub size: u64,
    /// Base64 of the original bytes
    #[serde(skip_serializing)]
    pub image_data: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>, filetype: impl Into<String>, size: u64, image_data: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            filetype: filetype.into(),
            size,
            image_data: Some(image_data),
            uploaded_at: Utc::now(),
        }
    }
}

/// File listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub filename: String,
    pub filetype: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// Whether at least one analysis exists for the file
    pub analyzed: bool,
}

/// A generated export archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: Uuid,
    pub analysis_id: Uuid,
    pub file_id: Uuid,
    pub format: String,
    pub download_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client heartbeat recorded through `/api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCheck {
    pub id: Uuid,
    pub client_name: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusCheck {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_name: client_name.into(),
            timestamp: Utc::now(),
        }
    }
}
