// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::Deserialize;

use crate::export::{ExportError, ExportFormat};

/// Query string of `/api/export/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    /// `yolo` (default), `coco` or `json`
    #[serde(default)]
    pub format: Option<String>,
}

impl ExportQuery {
    pub fn format(&self) -> Result<ExportFormat, ExportError> {
        match self.format.as_deref() {
            None | Some("") => Ok(ExportFormat::default()),
            Some(raw) => raw.parse(),
        }
    }
}
