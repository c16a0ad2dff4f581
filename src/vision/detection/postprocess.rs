// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO output decoding
//!
//! Turns the raw `[1, 4 + C, N]` (or `[1, N, 4 + C]`) head output into
//! corner-form predictions in source image pixels:
//! - best-class score filtering at the confidence threshold
//! - class-aware non-maximum suppression at the IoU threshold
//! - letterbox undo and clipping to the image bounds

use anyhow::Result;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;
use tracing::{debug, warn};

use super::preprocessing::LetterboxInfo;
use super::types::{InferenceThresholds, RawPrediction};

/// Upper bound on predictions returned per image
pub const MAX_DETECTIONS: usize = 300;

/// Candidates considered by NMS, highest scores first
pub const MAX_NMS_CANDIDATES: usize = 30_000;

/// Box coordinates preceding the class scores in each anchor row
const BOX_FEATURES: usize = 4;

/// A scored box in model input space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// `[x1, y1, x2, y2]`
    pub corners: [f32; 4],
    pub confidence: f32,
    pub class_index: usize,
}

/// Full post-processing for one image's head output
pub fn postprocess(
    output: ArrayViewD<'_, f32>,
    letterbox: &LetterboxInfo,
    thresholds: InferenceThresholds,
) -> Result<Vec<RawPrediction>> {
    let candidates = decode_candidates(output, thresholds.confidence)?;
    let before_nms = candidates.len();

    let kept = non_max_suppression(candidates, thresholds.iou);
    debug!(
        "YOLO postprocess: {} candidates, {} kept after NMS",
        before_nms,
        kept.len()
    );

    Ok(kept
        .into_iter()
        .map(|c| RawPrediction {
            corners: rescale_to_original(c.corners, letterbox),
            confidence: c.confidence,
            class_index: c.class_index as i64,
        })
        .collect())
}

/// Extract candidates scoring at least `confidence_threshold`
///
/// Accepts both export layouts; the smaller trailing dimension is taken as
/// the feature axis.
pub fn decode_candidates(
    output: ArrayViewD<'_, f32>,
    confidence_threshold: f32,
) -> Result<Vec<Candidate>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!(
            "Unexpected detection output shape: {:?}, expected [1, 4 + C, N] or [1, N, 4 + C]",
            shape
        );
    }

    let rows: ArrayView2<'_, f32> = output
        .index_axis_move(Axis(0), 0)
        .into_dimensionality::<Ix2>()?;

    // [F, N] -> one row per anchor
    let anchors = if shape[1] <= shape[2] {
        rows.reversed_axes()
    } else {
        rows
    };
    let features = anchors.ncols();

    if features <= BOX_FEATURES {
        anyhow::bail!(
            "Detection output has {} features per anchor, need at least {}",
            features,
            BOX_FEATURES + 1
        );
    }

    let mut candidates = Vec::new();
    for row in anchors.outer_iter() {
        let (class_index, score) = row
            .iter()
            .skip(BOX_FEATURES)
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (idx, &s)| {
                if s > best.1 {
                    (idx, s)
                } else {
                    best
                }
            });

        if !score.is_finite() || score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }

        candidates.push(Candidate {
            corners: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence: score,
            class_index,
        });
    }

    Ok(candidates)
}

/// Intersection over union of two corner-form boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union > f32::EPSILON {
        inter / union
    } else {
        0.0
    }
}

/// Class-aware NMS; output ordered by descending confidence
///
/// Boxes of different classes never suppress each other.
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    if candidates.len() > MAX_NMS_CANDIDATES {
        warn!(
            "NMS input truncated from {} to {} candidates",
            candidates.len(),
            MAX_NMS_CANDIDATES
        );
        candidates.truncate(MAX_NMS_CANDIDATES);
    }

    let mut suppressed = vec![false; candidates.len()];
    let mut kept = Vec::new();

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        kept.push(candidates[i]);
        if kept.len() == MAX_DETECTIONS {
            break;
        }

        for j in (i + 1)..candidates.len() {
            if !suppressed[j]
                && candidates[j].class_index == candidates[i].class_index
                && iou(&candidates[i].corners, &candidates[j].corners) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }

    kept
}

/// Undo the letterbox and clip to the source image
fn rescale_to_original(corners: [f32; 4], letterbox: &LetterboxInfo) -> [f32; 4] {
    let (x1, y1) = letterbox.map_to_original(corners[0], corners[1]);
    let (x2, y2) = letterbox.map_to_original(corners[2], corners[3]);

    let max_x = letterbox.original_width as f32;
    let max_y = letterbox.original_height as f32;

    [
        x1.clamp(0.0, max_x),
        y1.clamp(0.0, max_y),
        x2.clamp(0.0, max_x),
        y2.clamp(0.0, max_y),
    ]
}
