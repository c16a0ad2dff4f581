// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the detection path
//!
//! None of these are fatal to the process; each is reported once to the
//! caller of the request that produced it.

use thiserror::Error;

use super::image_utils::ImageError;

#[derive(Error, Debug)]
pub enum DetectionError {
    /// Payload missing, malformed, or not an image. Raised before the model is touched.
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    /// The model failed to load at startup; persists until restart.
    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model invocation itself failed.
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl DetectionError {
    /// Short machine-readable kind, used in structured failure responses
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::InvalidImage(_) => "invalid_image",
            DetectionError::ModelUnavailable(_) => "model_unavailable",
            DetectionError::Inference(_) => "inference_error",
        }
    }
}
