// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Fabstir Detect Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-single-image-detection-2025-11-03";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "base64-images",
    "data-uri-images",
    "yolo-onnx",
    "class-aware-nms",
    "detection-statistics",
    "degraded-startup",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Detect Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
