// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SQLite-backed store for uploads, analyses, exports and status checks

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use super::migrations::run_migrations;
use super::models::{ExportRecord, FileRecord, FileSummary, StatusCheck};
use super::StoreError;
use crate::analysis::{AnalysisResult, Detection};
use crate::vision::decode_base64;

const ANALYSIS_COLUMNS: &str = "a.id, a.file_id, f.filename, f.filetype, a.annotated_image, \
     a.image_width, a.image_height, a.total_objects, a.processing_time, a.created_at";

/// Persistent store shared by handlers
///
/// A single connection guarded by a mutex; every operation is a short
/// statement or transaction.
pub struct Store {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened database at {}", path.display());
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests and `sqlite::memory:`
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let version = run_migrations(&mut conn)?;
        debug!("Database schema at v{}", version);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    /// Run store operations on the blocking pool
    ///
    /// Async callers go through here so SQLite work and lock waits stay off
    /// the runtime's worker threads.
    pub async fn call<T, F>(self: &Arc<Self>, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Cheap liveness query used by the health endpoint
    pub fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    pub fn insert_file(&self, file: &FileRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO files(id, filename, filetype, size, image_data, uploaded_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    file.id.to_string(),
                    file.filename,
                    file.filetype,
                    file.size as i64,
                    file.image_data,
                    file.uploaded_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        self.with_conn(|conn| {
            let file = conn
                .query_row(
                    "SELECT id, filename, filetype, size, image_data, uploaded_at FROM files WHERE id = ?1",
                    params![id.to_string()],
                    |row| {
                        Ok(FileRecord {
                            id: uuid_column(row, 0)?,
                            filename: row.get(1)?,
                            filetype: row.get(2)?,
                            size: row.get::<_, i64>(3)? as u64,
                            image_data: row.get(4)?,
                            uploaded_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(file)
        })
    }

    /// Original upload bytes, if the file exists and has them
    pub fn get_file_image(&self, id: Uuid) -> Result<Option<Vec<u8>>, StoreError> {
        let file = match self.get_file(id)? {
            Some(file) => file,
            None => return Ok(None),
        };

        match file.image_data {
            Some(data) => decode_base64(&data)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("file {} image data: {}", id, e))),
            None => Ok(None),
        }
    }

    /// Newest uploads first
    pub fn list_files(&self, limit: usize) -> Result<Vec<FileSummary>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT f.id, f.filename, f.filetype, f.size, f.uploaded_at,
                       EXISTS(SELECT 1 FROM analyses a WHERE a.file_id = f.id)
                FROM files f
                ORDER BY f.uploaded_at DESC, f.rowid DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(FileSummary {
                    id: uuid_column(row, 0)?,
                    filename: row.get(1)?,
                    filetype: row.get(2)?,
                    size: row.get::<_, i64>(3)? as u64,
                    uploaded_at: row.get(4)?,
                    analyzed: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    /// Delete a file and, through cascades, its analyses, detections and exports
    pub fn delete_file(&self, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM files WHERE id = ?1", params![id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // ---------------------------------------------------------------------
    // Analyses
    // ---------------------------------------------------------------------

    /// Persist an analysis and its detections atomically
    ///
    /// The referenced file must already exist.
    pub fn insert_analysis(&self, analysis: &AnalysisResult) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO analyses(id, file_id, annotated_image, image_width, image_height,
                                     total_objects, processing_time, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    analysis.id.to_string(),
                    analysis.file_id.to_string(),
                    analysis.image_data,
                    analysis.image_width,
                    analysis.image_height,
                    analysis.total_objects as i64,
                    analysis.processing_time,
                    analysis.timestamp
                ],
            )?;

            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO detections(id, analysis_id, position, class_id, class_name,
                                           confidence, box_coordinates, color, processed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )?;
                for (position, det) in analysis.detections.iter().enumerate() {
                    stmt.execute(params![
                        det.id.to_string(),
                        analysis.id.to_string(),
                        position as i64,
                        det.class_id as i64,
                        det.class_name,
                        det.confidence as f64,
                        serde_json::to_string(&det.bbox)?,
                        det.color,
                        analysis.timestamp
                    ])?;
                }
            }

            tx.commit()?;
            debug!(
                "Stored analysis {} with {} detections",
                analysis.id,
                analysis.detections.len()
            );
            Ok(())
        })
    }

    pub fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisResult>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM analyses a JOIN files f ON f.id = a.file_id WHERE a.id = ?1",
                ANALYSIS_COLUMNS
            );
            let analysis = conn
                .query_row(&sql, params![id.to_string()], analysis_from_row)
                .optional()?;
            match analysis {
                Some(mut analysis) => {
                    analysis.detections = load_detections(conn, analysis.id)?;
                    Ok(Some(analysis))
                }
                None => Ok(None),
            }
        })
    }

    /// Newest analyses first
    pub fn list_analyses(&self, limit: usize) -> Result<Vec<AnalysisResult>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM analyses a JOIN files f ON f.id = a.file_id \
                 ORDER BY a.created_at DESC, a.rowid DESC LIMIT ?1",
                ANALYSIS_COLUMNS
            );
            let mut analyses = {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit as i64], analysis_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            for analysis in analyses.iter_mut() {
                analysis.detections = load_detections(conn, analysis.id)?;
            }
            Ok(analyses)
        })
    }

    /// Most recent analysis produced for an upload
    pub fn latest_analysis_for_file(&self, file_id: Uuid) -> Result<Option<AnalysisResult>, StoreError> {
        let latest: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id FROM analyses WHERE file_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    params![file_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match latest {
            Some(id) => {
                let id = Uuid::parse_str(&id)
                    .map_err(|e| StoreError::Corrupt(format!("analysis id '{}': {}", id, e)))?;
                self.get_analysis(id)
            }
            None => Ok(None),
        }
    }

    pub fn delete_analysis(&self, id: Uuid) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let deleted =
                conn.execute("DELETE FROM analyses WHERE id = ?1", params![id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // ---------------------------------------------------------------------
    // Exports
    // ---------------------------------------------------------------------

    pub fn insert_export(&self, export: &ExportRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO exports(id, analysis_id, file_id, format, download_url, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    export.id.to_string(),
                    export.analysis_id.to_string(),
                    export.file_id.to_string(),
                    export.format,
                    export.download_url,
                    export.created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_exports(&self, limit: usize) -> Result<Vec<ExportRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, analysis_id, file_id, format, download_url, created_at
                FROM exports
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(ExportRecord {
                    id: uuid_column(row, 0)?,
                    analysis_id: uuid_column(row, 1)?,
                    file_id: uuid_column(row, 2)?,
                    format: row.get(3)?,
                    download_url: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    // ---------------------------------------------------------------------
    // Status checks
    // ---------------------------------------------------------------------

    pub fn insert_status_check(&self, check: &StatusCheck) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO status_checks(id, client_name, timestamp) VALUES (?1, ?2, ?3)",
                params![check.id.to_string(), check.client_name, check.timestamp],
            )?;
            Ok(())
        })
    }

    /// Status checks in insertion order
    pub fn list_status_checks(&self, limit: usize) -> Result<Vec<StatusCheck>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_name, timestamp FROM status_checks ORDER BY rowid ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok(StatusCheck {
                    id: uuid_column(row, 0)?,
                    client_name: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisResult> {
    Ok(AnalysisResult {
        id: uuid_column(row, 0)?,
        file_id: uuid_column(row, 1)?,
        filename: row.get(2)?,
        file_type: row.get(3)?,
        image_data: row.get(4)?,
        image_width: row.get(5)?,
        image_height: row.get(6)?,
        detections: Vec::new(),
        total_objects: row.get::<_, i64>(7)? as usize,
        processing_time: row.get(8)?,
        timestamp: row.get(9)?,
    })
}

fn load_detections(conn: &Connection, analysis_id: Uuid) -> Result<Vec<Detection>, StoreError> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, class_id, class_name, confidence, box_coordinates, color
        FROM detections
        WHERE analysis_id = ?1
        ORDER BY position ASC
        "#,
    )?;
    let rows = stmt.query_map(params![analysis_id.to_string()], |row| {
        Ok((
            uuid_column(row, 0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut detections = Vec::new();
    for row in rows {
        let (id, class_id, class_name, confidence, bbox, color) = row?;
        detections.push(Detection {
            id,
            class_id: class_id as usize,
            class_name,
            confidence: confidence as f32,
            bbox: serde_json::from_str(&bbox)?,
            color,
        });
    }
    Ok(detections)
}
