// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection pipeline: model invocation, normalization, statistics

use tracing::{debug, warn};

use super::class_names::ClassNames;
use super::types::{
    BoundingBox, Detection, DetectionOutcome, InferenceThresholds, PredictionBatch, Statistics,
};
use crate::vision::errors::DetectionError;
use crate::vision::image_utils::CanonicalImage;
use crate::vision::model_manager::{DetectionModel, ModelState};

/// Shared, read-only service handed to request handlers
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    state: ModelState,
    thresholds: InferenceThresholds,
}

impl DetectionPipeline {
    pub fn new(state: ModelState) -> Self {
        Self {
            state,
            thresholds: InferenceThresholds::default(),
        }
    }

    pub fn from_model(model: DetectionModel) -> Self {
        Self::new(ModelState::Loaded(model))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(ModelState::FailedToLoad {
            reason: reason.into(),
        })
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_model_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Fail fast when the startup load failed
    pub fn ensure_available(&self) -> Result<&DetectionModel, DetectionError> {
        match &self.state {
            ModelState::Loaded(model) => Ok(model),
            ModelState::FailedToLoad { reason } => {
                Err(DetectionError::ModelUnavailable(reason.clone()))
            }
        }
    }

    /// Run the model once and normalize its output
    ///
    /// # Errors
    /// - `ModelUnavailable` if the model never loaded
    /// - `Inference` if the model call fails (not retried)
    pub fn detect(&self, image: &CanonicalImage) -> Result<DetectionOutcome, DetectionError> {
        let model = self.ensure_available()?;

        let batches = model
            .backend()
            .predict(image, self.thresholds)
            .map_err(|e| {
                warn!("Detection inference failed: {:#}", e);
                DetectionError::Inference(format!("{:#}", e))
            })?;

        if batches.len() > 1 {
            debug!("Model returned {} batches for one image, using the first", batches.len());
        }

        let detections = normalize(batches.into_iter().next(), model.class_names());
        let statistics = Statistics::from_detections(&detections);

        Ok(DetectionOutcome {
            detections,
            statistics,
        })
    }
}

/// Label and reshape raw predictions, preserving model order
///
/// A missing batch yields an empty set.
pub fn normalize(batch: Option<PredictionBatch>, class_names: &ClassNames) -> Vec<Detection> {
    batch
        .map(|b| b.predictions)
        .unwrap_or_default()
        .into_iter()
        .map(|p| Detection {
            class_name: class_names.label(p.class_index).to_string(),
            confidence: p.confidence,
            bounding_box: BoundingBox::from_corners(p.corners),
        })
        .collect()
}
