// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotation export in YOLO, COCO and JSON formats packaged as ZIP archives

pub mod archive;
pub mod formats;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::vision::{decode_base64, detect_format, format_to_extension};

pub use archive::{write_zip, ArchiveEntry};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format '{0}' (expected yolo, coco or json)")]
    UnsupportedFormat(String),

    #[error("No image available for analysis {0}")]
    MissingImage(String),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to write archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize annotations: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Yolo,
    Coco,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Yolo => "yolo",
            ExportFormat::Coco => "coco",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yolo" => Ok(ExportFormat::Yolo),
            "coco" => Ok(ExportFormat::Coco),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A finished archive ready to be sent to the client
#[derive(Debug, Clone)]
pub struct ExportPackage {
    /// `export_<analysis_id>.zip`
    pub filename: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// Archive name used for an analysis
pub fn archive_name(analysis: &AnalysisResult) -> String {
    format!("export_{}.zip", analysis.id)
}

/// Reduce an uploaded filename to a safe archive entry name
///
/// Keeps only the last path component. Falls back to `image.<ext>` when
/// nothing usable is left.
pub fn sanitize_filename(filename: &str, image: &[u8]) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        let ext = detect_format(image)
            .map(format_to_extension)
            .unwrap_or("jpg");
        format!("image.{}", ext)
    } else {
        name.to_string()
    }
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

/// Class list written next to YOLO labels
const CLASSES_ENTRY: &str = "classes.txt";

/// `<stem>.txt`, moved aside when the stem would shadow the class list
fn yolo_label_name(stem: &str) -> String {
    let name = format!("{}.txt", stem);
    if name == CLASSES_ENTRY {
        format!("labels_{}", name)
    } else {
        name
    }
}

/// Give every entry a distinct name; later duplicates get a numeric prefix
fn dedupe_entry_names(entries: &mut [ArchiveEntry]) {
    let mut seen = HashSet::new();
    for entry in entries.iter_mut() {
        let mut candidate = entry.name.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}_{}", n, entry.name);
            n += 1;
        }
        entry.name = candidate;
    }
}

/// Build the ZIP archive for an analysis
///
/// `original_image` is the uploaded file. When it is unavailable the
/// annotated JPEG stored with the analysis is packaged instead.
pub fn build_export(
    analysis: &AnalysisResult,
    original_image: Option<&[u8]>,
    format: ExportFormat,
) -> Result<ExportPackage, ExportError> {
    let image = match original_image {
        Some(bytes) if !bytes.is_empty() => bytes.to_vec(),
        _ => decode_base64(&analysis.image_data)
            .ok()
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| ExportError::MissingImage(analysis.id.to_string()))?,
    };

    let image_name = sanitize_filename(&analysis.filename, &image);
    let stem = file_stem(&image_name);

    let mut entries = match format {
        ExportFormat::Yolo => vec![
            ArchiveEntry::new(yolo_label_name(&stem), formats::yolo_labels(analysis)),
            ArchiveEntry::new(CLASSES_ENTRY, formats::yolo_classes(analysis)),
        ],
        ExportFormat::Coco => vec![ArchiveEntry::new(
            "annotations.json",
            serde_json::to_vec_pretty(&formats::coco_document(analysis, &image_name))?,
        )],
        ExportFormat::Json => vec![ArchiveEntry::new(
            format!("{}.json", stem),
            serde_json::to_vec_pretty(&formats::json_document(analysis)?)?,
        )],
    };

    let image_name = if entries.iter().any(|e| e.name == image_name) {
        format!("original_{}", image_name)
    } else {
        image_name
    };
    entries.insert(0, ArchiveEntry::new(image_name, image));
    dedupe_entry_names(&mut entries);

    let bytes = write_zip(&entries)?;
    debug!(
        "Built {} export for analysis {} ({} entries, {} bytes)",
        format,
        analysis.id,
        entries.len(),
        bytes.len()
    );

    Ok(ExportPackage {
        filename: archive_name(analysis),
        format,
        bytes,
    })
}
