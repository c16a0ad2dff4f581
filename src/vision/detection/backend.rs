// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The model capability seen by the pipeline

use anyhow::Result;

use super::types::{InferenceThresholds, PredictionBatch};
use crate::vision::image_utils::CanonicalImage;

/// Given an image, produce labelled corner-form boxes with confidences
///
/// Implementations must be callable from several request workers at once;
/// a runtime that cannot run concurrently serializes internally.
#[cfg_attr(test, mockall::automock)]
pub trait DetectionBackend: Send + Sync {
    /// Run the model once. Returns zero or one batch for the single image.
    fn predict(
        &self,
        image: &CanonicalImage,
        thresholds: InferenceThresholds,
    ) -> Result<Vec<PredictionBatch>>;
}
