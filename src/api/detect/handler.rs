// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::request::DetectRequest;
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{decode_base64_image, DetectionError};

/// POST /api/detect - Detect objects in one image
///
/// # Request
/// - `image`: Base64-encoded image, optionally as a `data:` URI (required)
///
/// # Response
/// - `success`: always true on 200
/// - `imageSize`: decoded width/height
/// - `detections`: `class`, `confidence`, `bbox` ([x, y, width, height]) in model order
/// - `statistics`: `totalDetections`, `averageConfidence`, `maxConfidence`
///
/// # Errors
/// - 400 Bad Request: missing `image`, malformed JSON, undecodable image
/// - 503 Service Unavailable: detection model failed to load at startup
/// - 500 Internal Server Error: inference failed
pub async fn detect_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    // 1. Parse and validate request
    let Json(request) = payload.map_err(|rejection| {
        warn!("[{}] Rejected detect body: {}", request_id, rejection.body_text());
        ApiError::InvalidRequest(rejection.body_text())
    })?;

    let image_data = request
        .validate()
        .map_err(|e| {
            warn!("[{}] Detect validation failed: {}", request_id, e);
            e
        })?
        .to_string();

    debug!(
        "[{}] Detect request received, {} payload bytes",
        request_id,
        image_data.len()
    );

    // 2. Check the model before spending time on decoding
    state.pipeline.ensure_available().map_err(|e| {
        warn!("[{}] {}", request_id, e);
        ApiError::from(e)
    })?;

    // 3. Decode and detect on the blocking pool
    let pipeline = state.pipeline.clone();
    let (info, outcome) = tokio::task::spawn_blocking(move || {
        let (image, info) = decode_base64_image(&image_data)?;
        debug!(
            "[{}] Decoded image: {}x{} {:?}, {} bytes",
            request_id, info.width, info.height, info.format, info.size_bytes
        );
        let outcome = pipeline.detect(&image)?;
        Ok::<_, DetectionError>((info, outcome))
    })
    .await
    .map_err(|e| {
        warn!("[{}] Detection worker failed: {}", request_id, e);
        ApiError::InternalError(format!("detection worker failed: {}", e))
    })?
    .map_err(|e| {
        warn!("[{}] Detect failed: {}", request_id, e);
        ApiError::from(e)
    })?;

    info!(
        "[{}] Detect complete: {} detections, {:.2} avg confidence, {}ms",
        request_id,
        outcome.statistics.total_detections,
        outcome.statistics.average_confidence,
        started.elapsed().as_millis()
    );

    // 4. Build response
    Ok(Json(DetectResponse::new(info.width, info.height, &outcome)))
}
