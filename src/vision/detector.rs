// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection model
//!
//! Wraps an ONNX export of a YOLOv8 model and turns its raw output tensor
//! into class-labelled bounding boxes in original image coordinates.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::classes;
use super::preprocessing::{preprocess_for_detection, LetterboxInfo, YOLO_INPUT_SIZE};

/// Axis-aligned box in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Intersection over union of two boxes
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter = BoundingBox {
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
        x2: a.x2.min(b.x2),
        y2: a.y2.min(b.y2),
    }
    .area();

    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// A single detected object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Thresholds applied when decoding model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Square model input size (640 for stock YOLOv8 exports)
    pub input_size: u32,
    /// Minimum class score kept
    pub confidence_threshold: f32,
    /// Overlap above which the weaker box of the same class is suppressed
    pub iou_threshold: f32,
    /// Upper bound on returned detections
    pub max_detections: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: YOLO_INPUT_SIZE,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Anything that can find objects in an image
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Short model identifier reported by the API
    fn model_name(&self) -> String;

    /// Human readable label for a class index
    fn class_name(&self, class_id: usize) -> String {
        classes::class_name(class_id)
    }

    /// Run detection on a decoded image
    fn detect(&self, image: &DynamicImage) -> Result<Vec<ObjectDetection>>;
}

/// YOLOv8 detector backed by ONNX Runtime
///
/// Runs on the CPU execution provider. The session is shared behind a mutex
/// because `Session::run` needs exclusive access.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model name derived from the file stem
    model_name: String,
    params: DetectorParams,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a YOLOv8 ONNX model from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(model_path: P, params: DetectorParams, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("YOLO model input: {} {:?}", input.name, input.input_type);
        }

        let model_name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolov8".to_string());

        info!("✅ YOLO model '{}' loaded (CPU)", model_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            model_name,
            params,
        })
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }
}

impl ObjectDetector for YoloDetector {
    fn model_name(&self) -> String {
        self.model_name.clone()
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<ObjectDetection>> {
        let (input, letterbox) = preprocess_for_detection(image, self.params.input_size);

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("YOLO session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("YOLO output shape: {:?}", output.shape());

        decode_yolo_output(output.view(), &self.params, &letterbox)
    }
}

/// Decode a raw YOLOv8 output tensor into detections
///
/// Accepts the stock `[1, 4 + C, N]` layout as well as the transposed
/// `[1, N, 4 + C]` layout some exporters produce. Each anchor row holds
/// `cx, cy, w, h` in letterboxed pixels followed by one score per class.
pub fn decode_yolo_output(
    output: ArrayViewD<f32>,
    params: &DetectorParams,
    letterbox: &LetterboxInfo,
) -> Result<Vec<ObjectDetection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected YOLO output shape: {:?}", shape);
    }

    let batch = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("YOLO output is not rank 3")?;
    // Anchors always outnumber attributes, so the larger axis is the anchor axis
    let anchors = if shape[1] > shape[2] {
        batch
    } else {
        batch.reversed_axes()
    };

    let attributes = anchors.shape()[1];
    if attributes < 5 {
        anyhow::bail!("YOLO output has no class scores: {:?}", shape);
    }

    let mut candidates = Vec::new();
    for row in anchors.outer_iter() {
        let (class_id, confidence) = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, score)| {
                if score > best.1 {
                    (i, score)
                } else {
                    best
                }
            });

        if confidence < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let (x1, y1) = letterbox.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.map_to_original(cx + w / 2.0, cy + h / 2.0);
        let (x1, y1) = letterbox.clamp_to_image(x1, y1);
        let (x2, y2) = letterbox.clamp_to_image(x2, y2);

        let bbox = BoundingBox { x1, y1, x2, y2 };
        if bbox.area() <= 0.0 {
            continue;
        }

        candidates.push(ObjectDetection {
            class_id,
            confidence,
            bbox,
        });
    }

    let kept = non_max_suppression(candidates, params.iou_threshold, params.max_detections);
    debug!("Decoded {} detections", kept.len());
    Ok(kept)
}

/// Class-aware greedy NMS; returns detections by descending confidence
pub fn non_max_suppression(
    mut candidates: Vec<ObjectDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<ObjectDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<ObjectDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
