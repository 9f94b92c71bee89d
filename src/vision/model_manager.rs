// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector manager for loading and sharing the object detection model

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::detector::{DetectorParams, ObjectDetector, YoloDetector};

/// Configuration for loading the detection model
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the YOLO ONNX model (optional)
    pub model_path: Option<PathBuf>,
    /// Decoding thresholds
    pub params: DetectorParams,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: Some(PathBuf::from("./models/yolov8n.onnx")),
            params: DetectorParams::default(),
            intra_threads: 4,
        }
    }
}

/// Information about the configured detection model
#[derive(Debug, Clone, Serialize)]
pub struct DetectorModelInfo {
    /// Model name
    pub name: String,
    /// Model type (always "detection")
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Owns the detector shared by request handlers and background tasks
///
/// A missing or unloadable model is not fatal: the server still starts and
/// detection endpoints answer 503 until a model is provided.
#[derive(Clone, Default)]
pub struct DetectorManager {
    detector: Option<Arc<dyn ObjectDetector>>,
}

impl std::fmt::Debug for DetectorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorManager")
            .field("has_detector", &self.has_detector())
            .finish()
    }
}

impl DetectorManager {
    /// Load the detector described by `config`
    pub fn new(config: &DetectorConfig) -> Self {
        let detector = match config.model_path {
            Some(ref path) => {
                match YoloDetector::new(path, config.params, config.intra_threads) {
                    Ok(model) => {
                        tracing::info!("✅ Detection model loaded from {}", path.display());
                        Some(Arc::new(model) as Arc<dyn ObjectDetector>)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Failed to load detection model from {}: {:#}",
                            path.display(),
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        Self { detector }
    }

    /// Wrap an already constructed detector
    pub fn with_detector(detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    /// Manager with no model loaded
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the detector if available
    pub fn detector(&self) -> Option<Arc<dyn ObjectDetector>> {
        self.detector.clone()
    }

    /// Check if detection is available
    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// List the configured detection models
    pub fn list_models(&self) -> Vec<DetectorModelInfo> {
        vec![DetectorModelInfo {
            name: self
                .detector
                .as_ref()
                .map(|d| d.model_name())
                .unwrap_or_else(|| "yolov8".to_string()),
            model_type: "detection".to_string(),
            available: self.detector.is_some(),
        }]
    }
}
