// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect API endpoint module
//!
//! Provides POST /api/detect for single-image object detection.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::detect_handler;
pub use request::DetectRequest;
pub use response::{DetectResponse, DetectionEntry, ImageSize, StatisticsSummary};
