// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis orchestration shared by the HTTP handlers
//!
//! Ties together upload validation, the detector, the store and the
//! background task tracker.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pipeline::{run_detection, validate_upload};
use super::tasks::{TaskState, TaskTracker};
use super::types::AnalysisResult;
use super::AnalysisError;
use crate::storage::{FileRecord, Store};
use crate::vision::{encode_base64, DetectorManager, ObjectDetector, MAX_IMAGE_SIZE};

/// Filename used when a multipart part carries none
pub const DEFAULT_FILENAME: &str = "image";

#[derive(Debug, Clone, Copy)]
pub struct AnalysisLimits {
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Maximum entries returned by history listings
    pub history_limit: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_IMAGE_SIZE,
            history_limit: 100,
        }
    }
}

/// Response for a stored upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub file_id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub size: u64,
}

/// Progress of a file's analysis as reported by `/api/analysis/{file_id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisStatus {
    Processing {
        file_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Done {
        file_id: Uuid,
        result: Box<AnalysisResult>,
    },
    Error {
        file_id: Uuid,
        detail: String,
    },
}

#[derive(Clone)]
pub struct AnalysisService {
    store: Arc<Store>,
    detectors: DetectorManager,
    tasks: Arc<TaskTracker>,
    limits: AnalysisLimits,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("detectors", &self.detectors)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl AnalysisService {
    pub fn new(store: Arc<Store>, detectors: DetectorManager, limits: AnalysisLimits) -> Self {
        Self {
            store,
            detectors,
            tasks: Arc::new(TaskTracker::new()),
            limits,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn tasks(&self) -> &Arc<TaskTracker> {
        &self.tasks
    }

    pub fn limits(&self) -> AnalysisLimits {
        self.limits
    }

    pub fn model_loaded(&self) -> bool {
        self.detectors.has_detector()
    }

    fn detector(&self) -> Result<Arc<dyn ObjectDetector>, AnalysisError> {
        self.detectors
            .detector()
            .ok_or(AnalysisError::ModelUnavailable)
    }

    async fn persist_upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<FileRecord, AnalysisError> {
        let record = FileRecord::new(
            filename,
            content_type,
            bytes.len() as u64,
            encode_base64(bytes),
        );
        let record = self
            .store
            .call(move |store| {
                store.insert_file(&record)?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    async fn save_analysis(&self, analysis: AnalysisResult) -> Result<AnalysisResult, AnalysisError> {
        let analysis = self
            .store
            .call(move |store| {
                store.insert_analysis(&analysis)?;
                Ok(analysis)
            })
            .await?;
        Ok(analysis)
    }

    /// Synchronous detection used by `POST /api/detect`
    ///
    /// The upload is stored as a file record before inference so the result
    /// can later be exported together with the original image.
    pub async fn detect_and_store(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<AnalysisResult, AnalysisError> {
        let (image, _info) = validate_upload(content_type, bytes, self.limits.max_upload_bytes)?;
        let detector = self.detector()?;

        let record = self.persist_upload(filename, content_type, bytes).await?;

        let file_id = record.id;
        let name = record.filename.clone();
        let file_type = record.filetype.clone();
        let analysis = tokio::task::spawn_blocking(move || {
            run_detection(detector.as_ref(), file_id, &name, &file_type, &image)
        })
        .await
        .map_err(|e| AnalysisError::Internal(format!("detection task failed: {}", e)))??;

        let analysis = self.save_analysis(analysis).await?;
        info!(
            "Analysis {} for {}: {} objects in {:.3}s",
            analysis.id, analysis.filename, analysis.total_objects, analysis.processing_time
        );
        Ok(analysis)
    }

    /// Store an upload without analysing it
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<UploadReceipt, AnalysisError> {
        validate_upload(content_type, bytes, self.limits.max_upload_bytes)?;
        let record = self.persist_upload(filename, content_type, bytes).await?;
        info!("Stored upload {} ({} bytes)", record.id, record.size);
        Ok(UploadReceipt {
            file_id: record.id,
            filename: record.filename,
            file_type: record.filetype,
            size: record.size,
        })
    }

    /// Queue analysis of a previously uploaded file
    ///
    /// Returns false, without spawning, when a task for the file is still
    /// running.
    pub async fn start_background_analysis(&self, file_id: Uuid) -> Result<bool, AnalysisError> {
        let file = self
            .store
            .call(move |store| store.get_file(file_id))
            .await?
            .ok_or_else(|| AnalysisError::NotFound("File not found".to_string()))?;
        let detector = self.detector()?;

        let ticket = match self.tasks.try_begin(file_id).await {
            Some(ticket) => ticket,
            None => return Ok(false),
        };

        info!("Background analysis started for file {}", file_id);
        let service = self.clone();
        tokio::spawn(async move {
            match service.analyze_stored(file, detector).await {
                Ok(analysis) => {
                    if service.tasks.complete(file_id, ticket).await {
                        info!(
                            "Background analysis {} finished for file {}",
                            analysis.id, file_id
                        );
                    }
                }
                Err(e) => {
                    if service.tasks.fail(file_id, ticket, e.to_string()).await {
                        warn!("Background analysis failed for file {}: {}", file_id, e);
                    } else {
                        debug!(
                            "Dropping outcome for file {} removed during analysis: {}",
                            file_id, e
                        );
                    }
                }
            }
        });

        Ok(true)
    }

    async fn analyze_stored(
        &self,
        file: FileRecord,
        detector: Arc<dyn ObjectDetector>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let file_id = file.id;
        let bytes = self
            .store
            .call(move |store| store.get_file_image(file_id))
            .await?
            .ok_or_else(|| AnalysisError::NotFound("File has no stored image data".to_string()))?;
        let max_size = self.limits.max_upload_bytes;

        let analysis = tokio::task::spawn_blocking(move || {
            let (image, _info) = validate_upload(&file.filetype, &bytes, max_size)?;
            run_detection(detector.as_ref(), file.id, &file.filename, &file.filetype, &image)
        })
        .await
        .map_err(|e| AnalysisError::Internal(format!("detection task failed: {}", e)))??;

        self.save_analysis(analysis).await
    }

    /// Current state of a file's analysis
    ///
    /// A running or failed task wins; otherwise the latest stored analysis
    /// counts as done. `None` when neither exists.
    pub async fn analysis_status(
        &self,
        file_id: Uuid,
    ) -> Result<Option<AnalysisStatus>, AnalysisError> {
        match self.tasks.get(file_id).await {
            Some(TaskState::Processing { started_at }) => {
                return Ok(Some(AnalysisStatus::Processing {
                    file_id,
                    started_at,
                }))
            }
            Some(TaskState::Error { detail }) => {
                return Ok(Some(AnalysisStatus::Error { file_id, detail }))
            }
            None => {}
        }

        Ok(self
            .store
            .call(move |store| store.latest_analysis_for_file(file_id))
            .await?
            .map(|result| AnalysisStatus::Done {
                file_id,
                result: Box::new(result),
            }))
    }

    pub async fn recent_analyses(&self) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let limit = self.limits.history_limit;
        Ok(self.store.call(move |store| store.list_analyses(limit)).await?)
    }

    /// Delete an upload with everything derived from it
    ///
    /// A task still running for the file is forgotten; its outcome is
    /// discarded when it finishes.
    pub async fn delete_file(&self, file_id: Uuid) -> Result<bool, AnalysisError> {
        let deleted = self
            .store
            .call(move |store| store.delete_file(file_id))
            .await?;
        self.tasks.remove(file_id).await;
        if deleted {
            info!("Deleted file {}", file_id);
        }
        Ok(deleted)
    }
}
