// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::analyses::{delete_analysis_handler, get_analysis_handler, list_analyses_handler};
use super::detect::detect_handler;
use super::export::{export_handler, list_exports_handler};
use super::files::{
    analysis_status_handler, analyze_handler, delete_file_handler, list_files_handler,
    upload_handler,
};
use super::handlers::{
    create_status_check_handler, health_handler, list_status_checks_handler, root_handler,
};
use crate::analysis::AnalysisService;
use crate::config::{DatabaseLocation, ServerConfig};
use crate::storage::{Store, StoreError};
use crate::vision::{DetectorManager, ObjectDetector};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub analysis: AnalysisService,
    pub store: Arc<Store>,
    pub detectors: DetectorManager,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<Store>, detectors: DetectorManager) -> Self {
        let analysis =
            AnalysisService::new(store.clone(), detectors.clone(), config.analysis_limits());
        Self {
            analysis,
            store,
            detectors,
            config: Arc::new(config),
        }
    }

    /// Open the database and load the model described by `config`
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let store = match config.database_path()? {
            DatabaseLocation::Memory => {
                warn!("Using in-memory database, results will not survive a restart");
                Store::open_in_memory()?
            }
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
                Store::open(&path)?
            }
        };

        let detectors = DetectorManager::new(&config.detector_config());
        if !detectors.has_detector() {
            warn!("Starting without a detection model, /api/detect will answer 503");
        }

        Ok(Self::new(config, Arc::new(store), detectors))
    }

    /// In-memory state with an optional detector
    pub fn new_for_test(detector: Option<Arc<dyn ObjectDetector>>) -> Result<Self, StoreError> {
        let detectors = match detector {
            Some(detector) => DetectorManager::with_detector(detector),
            None => DetectorManager::empty(),
        };
        Ok(Self::new(
            ServerConfig::for_test(),
            Arc::new(Store::open_in_memory()?),
            detectors,
        ))
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_allows_any() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let cors = cors_layer(&state.config);

    Router::new()
        // Health check
        .route("/health", get(health_handler))
        .route("/api", get(root_handler))
        .route("/api/", get(root_handler))
        // Synchronous detection and history
        .route("/api/detect", post(detect_handler))
        .route("/api/analyses", get(list_analyses_handler))
        .route(
            "/api/analyses/:id",
            get(get_analysis_handler).delete(delete_analysis_handler),
        )
        // Exports
        .route("/api/export/:id", get(export_handler).post(export_handler))
        .route("/api/exports", get(list_exports_handler))
        // Uploads and background analysis
        .route("/api/upload", post(upload_handler))
        .route("/api/files", get(list_files_handler))
        .route("/api/files/:id", delete(delete_file_handler))
        .route("/api/analyze/:file_id", post(analyze_handler))
        .route("/api/analysis/:file_id", get(analysis_status_handler))
        // Client status checks
        .route(
            "/api/status",
            get(list_status_checks_handler).post(create_status_check_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    config.validate()?;
    let addr = config.listen_addr;
    let state = AppState::from_config(config)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("VisionFlow API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}
