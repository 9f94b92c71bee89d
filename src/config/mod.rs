// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration from command line flags and environment variables

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::analysis::AnalysisLimits;
use crate::vision::{DetectorConfig, DetectorParams, MAX_IMAGE_SIZE};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://visionflow.db";
pub const DEFAULT_MODEL_PATH: &str = "./models/yolov8n.onnx";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Unsupported database URL '{0}' (expected sqlite://<path>, a file path or sqlite::memory:)")]
    UnsupportedDatabaseUrl(String),
}

/// Where the SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

/// VisionFlow server settings
#[derive(Parser, Debug, Clone)]
#[command(name = "visionflow-server")]
#[command(version)]
#[command(about = "Object detection API backed by YOLOv8", long_about = None)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// SQLite database (sqlite://<path>, plain path or sqlite::memory:)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// YOLOv8 ONNX model file
    #[arg(long, env = "YOLO_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Minimum detection confidence
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    /// NMS overlap threshold
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.45)]
    pub iou_threshold: f32,

    /// Maximum detections kept per image
    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Largest accepted upload in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_IMAGE_SIZE)]
    pub max_upload_bytes: usize,

    /// Maximum entries returned by history listings
    #[arg(long, env = "HISTORY_LIMIT", default_value_t = 100)]
    pub history_limit: usize,

    /// Comma-separated allowed origins, `*` for any
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let params = DetectorParams::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence_threshold: params.confidence_threshold,
            iou_threshold: params.iou_threshold,
            max_detections: params.max_detections,
            intra_threads: 4,
            max_upload_bytes: MAX_IMAGE_SIZE,
            history_limit: 100,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Configuration for tests: in-memory database, no model file
    pub fn for_test() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            model_path: PathBuf::new(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.max_detections == 0 {
            return Err(ConfigError::Zero("max_detections"));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Zero("intra_threads"));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Zero("max_upload_bytes"));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Zero("history_limit"));
        }
        self.database_path().map(|_| ())
    }

    /// Resolve `database_url` into a location
    pub fn database_path(&self) -> Result<DatabaseLocation, ConfigError> {
        let url = self.database_url.trim();
        match url {
            "sqlite::memory:" | ":memory:" | "sqlite://:memory:" => Ok(DatabaseLocation::Memory),
            "" => Err(ConfigError::UnsupportedDatabaseUrl(url.to_string())),
            _ => {
                let path = url
                    .strip_prefix("sqlite://")
                    .or_else(|| url.strip_prefix("sqlite:"))
                    .unwrap_or(url);
                if path.is_empty() || path.contains("://") {
                    return Err(ConfigError::UnsupportedDatabaseUrl(url.to_string()));
                }
                Ok(DatabaseLocation::File(PathBuf::from(path)))
            }
        }
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
            ..DetectorParams::default()
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        let model_path = if self.model_path.as_os_str().is_empty() {
            None
        } else {
            Some(self.model_path.clone())
        };
        DetectorConfig {
            model_path,
            params: self.detector_params(),
            intra_threads: self.intra_threads,
        }
    }

    pub fn analysis_limits(&self) -> AnalysisLimits {
        AnalysisLimits {
            max_upload_bytes: self.max_upload_bytes,
            history_limit: self.history_limit,
        }
    }

    /// True when any origin is allowed
    pub fn cors_allows_any(&self) -> bool {
        self.cors_allowed_origins.is_empty()
            || self.cors_allowed_origins.iter().any(|o| o.trim() == "*")
    }
}
