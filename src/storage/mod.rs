// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedded SQLite persistence

pub mod migrations;
pub mod models;
pub mod store;

use thiserror::Error;

pub use models::{ExportRecord, FileRecord, FileSummary, StatusCheck};
pub use store::Store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("database schema v{found} is newer than supported v{supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database task failed: {0}")]
    Task(String),
}
