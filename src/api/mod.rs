// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyses;
pub mod detect;
pub mod errors;
pub mod export;
pub mod extract;
pub mod files;
pub mod handlers;
pub mod http_server;

pub use analyses::DeleteResponse;
pub use detect::detect_handler;
pub use errors::{ApiError, ErrorResponse};
pub use export::ExportQuery;
pub use files::AnalyzeResponse;
pub use handlers::{HealthResponse, StatusCheckCreate, ROOT_MESSAGE};
pub use http_server::{create_app, start_server, AppState};
