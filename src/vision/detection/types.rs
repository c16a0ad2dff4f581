// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection data model

/// Minimum score for a raw prediction to be kept
pub const CONFIDENCE_THRESHOLD: f32 = 0.20;

/// IoU above which the model's duplicate-removal step suppresses a box
pub const IOU_THRESHOLD: f32 = 0.45;

/// Thresholds passed to the model on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceThresholds {
    pub confidence: f32,
    pub iou: f32,
}

impl Default for InferenceThresholds {
    fn default() -> Self {
        Self {
            confidence: CONFIDENCE_THRESHOLD,
            iou: IOU_THRESHOLD,
        }
    }
}

/// One prediction as the model emits it, in two-corner form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPrediction {
    /// `[x1, y1, x2, y2]` in image pixels
    pub corners: [f32; 4],
    pub confidence: f32,
    pub class_index: i64,
}

/// All predictions for one input image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionBatch {
    pub predictions: Vec<RawPrediction>,
}

/// Top-left corner plus extent, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Convert `(x1, y1, x2, y2)` to `(x, y, width, height)`
    ///
    /// No clamping and no reordering: `x2 < x1` yields a negative width.
    pub fn from_corners([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

/// A normalized detection
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Summary over a completed detection set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub total_detections: usize,
    pub average_confidence: f32,
    pub max_confidence: f32,
}

impl Statistics {
    /// Zero-valued for an empty set
    pub fn from_detections(detections: &[Detection]) -> Self {
        if detections.is_empty() {
            return Self {
                total_detections: 0,
                average_confidence: 0.0,
                max_confidence: 0.0,
            };
        }

        let sum: f64 = detections.iter().map(|d| d.confidence as f64).sum();
        let max = detections
            .iter()
            .map(|d| d.confidence)
            .fold(f32::NEG_INFINITY, f32::max);

        Self {
            total_detections: detections.len(),
            average_confidence: (sum / detections.len() as f64) as f32,
            max_confidence: max,
        }
    }
}

/// Pipeline output for one image
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    /// In model order, never re-sorted
    pub detections: Vec<Detection>,
    pub statistics: Statistics,
}
