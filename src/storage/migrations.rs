// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Versioned schema migrations tracked through `PRAGMA user_version`

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

/// A single forward-only schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const V1_INITIAL_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
  id TEXT PRIMARY KEY,
  filename TEXT NOT NULL,
  filetype TEXT NOT NULL,
  size INTEGER NOT NULL,
  uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analyses (
  id TEXT PRIMARY KEY,
  file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
  annotated_image TEXT NOT NULL,
  image_width INTEGER NOT NULL,
  image_height INTEGER NOT NULL,
  total_objects INTEGER NOT NULL,
  processing_time REAL NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS detections (
  id TEXT PRIMARY KEY,
  analysis_id TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
  position INTEGER NOT NULL,
  class_id INTEGER NOT NULL,
  class_name TEXT NOT NULL,
  confidence REAL NOT NULL,
  box_coordinates TEXT NOT NULL,
  color TEXT NOT NULL,
  processed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_uploaded ON files(uploaded_at);
CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);
CREATE INDEX IF NOT EXISTS idx_analyses_file ON analyses(file_id);
CREATE INDEX IF NOT EXISTS idx_detections_analysis ON detections(analysis_id, position);
"#;

// Original upload bytes, base64 encoded, kept for exports
const V2_FILE_IMAGE_DATA: &str = r#"
ALTER TABLE files ADD COLUMN image_data TEXT;
"#;

const V3_EXPORTS_AND_STATUS: &str = r#"
CREATE TABLE IF NOT EXISTS exports (
  id TEXT PRIMARY KEY,
  analysis_id TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
  file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE,
  format TEXT NOT NULL,
  download_url TEXT,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS status_checks (
  id TEXT PRIMARY KEY,
  client_name TEXT NOT NULL,
  timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_exports_created ON exports(created_at);
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: V1_INITIAL_SCHEMA,
    },
    Migration {
        version: 2,
        name: "file_image_data",
        sql: V2_FILE_IMAGE_DATA,
    },
    Migration {
        version: 3,
        name: "exports_and_status_checks",
        sql: V3_EXPORTS_AND_STATUS,
    },
];

/// Latest schema version known to this build
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Current `user_version` of the database
pub fn schema_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Apply every migration newer than the database's version
///
/// Each step runs in its own transaction together with the version bump.
/// Returns the resulting schema version.
pub fn run_migrations(conn: &mut Connection) -> Result<u32, StoreError> {
    let current = schema_version(conn)?;
    if current > latest_version() {
        return Err(StoreError::SchemaTooNew {
            found: current,
            supported: latest_version(),
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        info!(
            "Applied migration v{} ({})",
            migration.version, migration.name
        );
    }

    schema_version(conn)
}
