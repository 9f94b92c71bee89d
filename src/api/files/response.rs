// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Acknowledgement of a queued background analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Always `processing`
    pub status: String,
    pub file_id: Uuid,
}

impl AnalyzeResponse {
    pub fn processing(file_id: Uuid) -> Self {
        Self {
            status: "processing".to_string(),
            file_id,
        }
    }
}
