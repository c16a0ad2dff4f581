// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect response types

use serde::{Deserialize, Serialize};

use crate::vision::detection::{Detection, DetectionOutcome, Statistics};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One detection as sent to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionEntry {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    /// `[x, y, width, height]` in pixels
    pub bbox: [f32; 4],
}

impl From<&Detection> for DetectionEntry {
    fn from(d: &Detection) -> Self {
        Self {
            class_name: d.class_name.clone(),
            confidence: d.confidence,
            bbox: d.bounding_box.to_array(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSummary {
    pub total_detections: usize,
    pub average_confidence: f32,
    pub max_confidence: f32,
}

impl From<Statistics> for StatisticsSummary {
    fn from(s: Statistics) -> Self {
        Self {
            total_detections: s.total_detections,
            average_confidence: s.average_confidence,
            max_confidence: s.max_confidence,
        }
    }
}

/// Successful detection response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub success: bool,
    pub image_size: ImageSize,
    pub detections: Vec<DetectionEntry>,
    pub statistics: StatisticsSummary,
}

impl DetectResponse {
    pub fn new(width: u32, height: u32, outcome: &DetectionOutcome) -> Self {
        Self {
            success: true,
            image_size: ImageSize { width, height },
            detections: outcome.detections.iter().map(DetectionEntry::from).collect(),
            statistics: outcome.statistics.into(),
        }
    }
}
