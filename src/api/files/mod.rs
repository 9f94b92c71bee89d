// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload and background analysis endpoints

pub mod handler;
pub mod response;

pub use handler::{
    analysis_status_handler, analyze_handler, delete_file_handler, list_files_handler,
    upload_handler,
};
pub use response::AnalyzeResponse;
