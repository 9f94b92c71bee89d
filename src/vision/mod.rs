// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for object detection
//!
//! This module provides:
//! - Upload decoding and JPEG/base64 encoding
//! - YOLOv8 inference via ONNX Runtime (CPU)
//! - Bounding box drawing for annotated previews

pub mod annotate;
pub mod classes;
pub mod detector;
pub mod image_utils;
pub mod model_manager;
pub mod preprocessing;

pub use annotate::{draw_detections, label_text, BoxAnnotation};
pub use detector::{
    decode_yolo_output, iou, BoundingBox, DetectorParams, ObjectDetection, ObjectDetector,
    YoloDetector,
};
pub use image_utils::{
    decode_base64, decode_image_bytes, detect_format, encode_base64, encode_jpeg_base64,
    format_to_extension, ImageError, ImageInfo, MAX_IMAGE_SIZE,
};
pub use model_manager::{DetectorConfig, DetectorManager, DetectorModelInfo};
