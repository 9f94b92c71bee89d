// Version information for the VisionFlow server

/// Full version string with feature description
pub const VERSION: &str = "v1.2.0-exports-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Major version number
pub const VERSION_MAJOR: u32 = 1;

/// Minor version number
pub const VERSION_MINOR: u32 = 2;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolov8-detection",
    "onnx-cpu",
    "annotated-previews",
    "sqlite-history",
    "background-analysis",
    "export-yolo",
    "export-coco",
    "export-json",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("VisionFlow Server {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
