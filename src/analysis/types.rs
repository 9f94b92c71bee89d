// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis result types returned by the API and persisted by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One labelled box in an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: Uuid,
    pub class_id: usize,
    pub class_name: String,
    /// Model score (0.0-1.0)
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in original image pixels
    pub bbox: [f32; 4],
    /// `#RRGGBB` colour used in the annotated image
    pub color: String,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bbox[3] - self.bbox[1]).max(0.0)
    }
}

/// Outcome of running the detector over one uploaded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    /// Upload this analysis was produced from
    pub file_id: Uuid,
    pub filename: String,
    /// Upload content type, e.g. `image/jpeg`
    pub file_type: String,
    /// Base64 JPEG of the annotated image
    pub image_data: String,
    pub image_width: u32,
    pub image_height: u32,
    pub detections: Vec<Detection>,
    pub total_objects: usize,
    /// Seconds spent in model inference
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
}
