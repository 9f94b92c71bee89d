// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotation file contents for each export format

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::analysis::AnalysisResult;
use crate::version::VERSION;
use crate::vision::classes;

/// YOLO label lines: `class_id cx cy w h`, normalised to the image size
pub fn yolo_labels(analysis: &AnalysisResult) -> Vec<u8> {
    let width = analysis.image_width.max(1) as f32;
    let height = analysis.image_height.max(1) as f32;

    let mut out = String::new();
    for det in &analysis.detections {
        let [x1, y1, x2, y2] = det.bbox;
        let cx = ((x1 + x2) / 2.0 / width).clamp(0.0, 1.0);
        let cy = ((y1 + y2) / 2.0 / height).clamp(0.0, 1.0);
        let w = (det.width() / width).clamp(0.0, 1.0);
        let h = (det.height() / height).clamp(0.0, 1.0);
        out.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            det.class_id, cx, cy, w, h
        ));
    }
    out.into_bytes()
}

/// `classes.txt` listing class names from 0 up to the highest id used
pub fn yolo_classes(analysis: &AnalysisResult) -> Vec<u8> {
    let max_id = match analysis.detections.iter().map(|d| d.class_id).max() {
        Some(id) => id,
        None => return Vec::new(),
    };

    let mut out = String::new();
    for id in 0..=max_id {
        let name = analysis
            .detections
            .iter()
            .find(|d| d.class_id == id)
            .map(|d| d.class_name.clone())
            .unwrap_or_else(|| classes::class_name(id));
        out.push_str(&name);
        out.push('\n');
    }
    out.into_bytes()
}

#[derive(Debug, Serialize)]
pub struct CocoDocument {
    pub info: CocoInfo,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Serialize)]
pub struct CocoInfo {
    pub description: String,
    pub version: String,
    pub date_created: String,
}

#[derive(Debug, Serialize)]
pub struct CocoImage {
    pub id: u32,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct CocoAnnotation {
    pub id: usize,
    pub image_id: u32,
    pub category_id: usize,
    /// `[x, y, width, height]`
    pub bbox: [f32; 4],
    pub area: f32,
    pub iscrowd: u8,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct CocoCategory {
    pub id: usize,
    pub name: String,
    pub supercategory: String,
}

/// COCO document with a single image
///
/// Category ids are `class_id + 1` since COCO reserves 0.
pub fn coco_document(analysis: &AnalysisResult, image_name: &str) -> CocoDocument {
    let annotations = analysis
        .detections
        .iter()
        .enumerate()
        .map(|(i, det)| {
            let (w, h) = (det.width(), det.height());
            CocoAnnotation {
                id: i + 1,
                image_id: 1,
                category_id: det.class_id + 1,
                bbox: [det.bbox[0], det.bbox[1], w, h],
                area: w * h,
                iscrowd: 0,
                score: det.confidence,
            }
        })
        .collect();

    let present: BTreeMap<usize, &str> = analysis
        .detections
        .iter()
        .map(|d| (d.class_id, d.class_name.as_str()))
        .collect();
    let categories = present
        .into_iter()
        .map(|(id, name)| CocoCategory {
            id: id + 1,
            name: name.to_string(),
            supercategory: "object".to_string(),
        })
        .collect();

    CocoDocument {
        info: CocoInfo {
            description: format!("VisionFlow analysis {}", analysis.id),
            version: VERSION.to_string(),
            date_created: analysis.timestamp.to_rfc3339(),
        },
        images: vec![CocoImage {
            id: 1,
            file_name: image_name.to_string(),
            width: analysis.image_width,
            height: analysis.image_height,
        }],
        annotations,
        categories,
    }
}

/// The analysis as JSON without the annotated image payload
pub fn json_document(analysis: &AnalysisResult) -> Result<Value, serde_json::Error> {
    let mut doc = serde_json::to_value(analysis)?;
    if let Value::Object(ref mut map) = doc {
        map.remove("image_data");
    }
    Ok(doc)
}
