// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analysis;
pub mod api;
pub mod config;
pub mod export;
pub mod storage;
pub mod version;
pub mod vision;

pub use analysis::{AnalysisError, AnalysisResult, AnalysisService, Detection};
pub use api::{create_app, start_server, AppState};
pub use config::ServerConfig;
pub use export::{build_export, ExportFormat, ExportPackage};
pub use storage::Store;
pub use vision::{DetectorManager, ObjectDetector, YoloDetector};
