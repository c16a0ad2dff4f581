// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for the detection endpoint
//!
//! This module provides:
//! - Image decoding from base64 / `data:` URI payloads
//! - Object detection via an ONNX YOLO model
//!
//! Inference runs on CPU only.

pub mod detection;
pub mod errors;
pub mod image_utils;
pub mod model_manager;

pub use detection::{Detection, DetectionOutcome, DetectionPipeline, Statistics};
pub use errors::DetectionError;
pub use image_utils::{decode_base64_image, decode_image_bytes, CanonicalImage, ImageError, ImageInfo};
pub use model_manager::{DetectionModel, DetectionModelConfig, ModelState};
