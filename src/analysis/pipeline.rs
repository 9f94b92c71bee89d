// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload validation and detection for a single image

use chrono::Utc;
use image::DynamicImage;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::types::{AnalysisResult, Detection};
use super::AnalysisError;
use crate::vision::annotate::label_text;
use crate::vision::classes::color_for_class;
use crate::vision::{
    decode_image_bytes, draw_detections, encode_jpeg_base64, BoxAnnotation, ImageError, ImageInfo,
    ObjectDetector,
};

/// True for `image/*` content types
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Check the declared type and decode the bytes
pub fn validate_upload(
    content_type: &str,
    bytes: &[u8],
    max_size: usize,
) -> Result<(DynamicImage, ImageInfo), AnalysisError> {
    if !is_image_content_type(content_type) {
        return Err(AnalysisError::UnsupportedMediaType(content_type.to_string()));
    }

    decode_image_bytes(bytes, max_size).map_err(|e| match e {
        ImageError::TooLarge(size, max) => AnalysisError::TooLarge { size, max },
        other => AnalysisError::InvalidImage(other.to_string()),
    })
}

/// Run the detector over a decoded image and build the result
///
/// `processing_time` covers inference only; annotation and encoding are
/// excluded.
pub fn run_detection(
    detector: &dyn ObjectDetector,
    file_id: Uuid,
    filename: &str,
    content_type: &str,
    image: &DynamicImage,
) -> Result<AnalysisResult, AnalysisError> {
    let started = Instant::now();
    let found = detector
        .detect(image)
        .map_err(|e| AnalysisError::Inference(format!("{:#}", e)))?;
    let processing_time = started.elapsed().as_secs_f64();

    let detections: Vec<Detection> = found
        .iter()
        .map(|d| Detection {
            id: Uuid::new_v4(),
            class_id: d.class_id,
            class_name: detector.class_name(d.class_id),
            confidence: d.confidence,
            bbox: d.bbox.to_array(),
            color: color_for_class(d.class_id).to_string(),
        })
        .collect();

    let annotations: Vec<BoxAnnotation> = found
        .iter()
        .zip(&detections)
        .map(|(d, det)| BoxAnnotation {
            bbox: d.bbox,
            color: det.color.clone(),
            label: label_text(&det.class_name, d.confidence),
        })
        .collect();
    let annotated = DynamicImage::ImageRgb8(draw_detections(image, &annotations));
    let image_data =
        encode_jpeg_base64(&annotated).map_err(|e| AnalysisError::Internal(e.to_string()))?;

    debug!(
        "{} objects in {} ({:.3}s, model {})",
        detections.len(),
        filename,
        processing_time,
        detector.model_name()
    );

    Ok(AnalysisResult {
        id: Uuid::new_v4(),
        file_id,
        filename: filename.to_string(),
        file_type: content_type.to_string(),
        image_data,
        image_width: image.width(),
        image_height: image.height(),
        total_objects: detections.len(),
        detections,
        processing_time,
        timestamp: Utc::now(),
    })
}

/// Validate, decode and analyse raw upload bytes
pub fn analyze_image(
    detector: &dyn ObjectDetector,
    file_id: Uuid,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
    max_size: usize,
) -> Result<AnalysisResult, AnalysisError> {
    let (image, _info) = validate_upload(content_type, bytes, max_size)?;
    run_detection(detector, file_id, filename, content_type, &image)
}
