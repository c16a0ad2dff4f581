// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection over canonical images
//!
//! Components:
//! - `pipeline` - model invocation, label lookup, box conversion, statistics
//! - `backend` - the model capability trait
//! - `yolo` - ONNX Runtime YOLO backend
//! - `preprocessing` / `postprocess` - letterbox in, NMS and rescale out
//! - `class_names` - class-index table with the fallback label

pub mod backend;
pub mod class_names;
pub mod pipeline;
pub mod postprocess;
pub mod preprocessing;
pub mod types;
pub mod yolo;

pub use backend::DetectionBackend;
pub use class_names::{ClassNames, FALLBACK_CLASS_NAME};
pub use pipeline::{normalize, DetectionPipeline};
pub use preprocessing::{letterbox, LetterboxInfo, DEFAULT_INPUT_SIZE};
pub use types::{
    BoundingBox, Detection, DetectionOutcome, InferenceThresholds, PredictionBatch, RawPrediction,
    Statistics, CONFIDENCE_THRESHOLD, IOU_THRESHOLD,
};
pub use yolo::YoloOnnxModel;
