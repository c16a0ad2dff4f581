// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detect endpoint tests for POST /api/detect
//!
//! These tests drive the full router with a canned backend and verify:
//! - Successful responses carry image size, detections and statistics
//! - Request and image errors are rejected before the model is called
//! - A failed startup load yields 503 on every call
//! - One failed inference does not affect later requests

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use fabstir_detect_node::api::{create_router, AppState};
use fabstir_detect_node::vision::DetectionPipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{batch, png_base64, pipeline_with, prediction, FakeBackend};

fn app_with(backend: Arc<FakeBackend>, names: &[&str]) -> Router {
    create_router(AppState::new(pipeline_with(backend, names)))
}

fn detect_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/detect")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap();
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[cfg(test)]
mod detect_endpoint_tests {
    use super::*;

    // =============================================================================
    // Success path
    // =============================================================================

    #[tokio::test]
    async fn test_single_detection_response() {
        let backend = FakeBackend::returning(vec![batch(vec![prediction(
            [10.0, 20.0, 110.0, 70.0],
            0.83,
            0,
        )])]);
        let app = app_with(backend.clone(), &["caries"]);

        let (status, body) = send(app, detect_request(json!({ "image": png_base64(640, 480) }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["imageSize"], json!({ "width": 640, "height": 480 }));

        let detections = body["detections"].as_array().unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0]["class"], "caries");
        assert_close(&detections[0]["confidence"], 0.83);
        assert_eq!(detections[0]["bbox"], json!([10.0, 20.0, 100.0, 50.0]));

        assert_eq!(body["statistics"]["totalDetections"], 1);
        assert_close(&body["statistics"]["averageConfidence"], 0.83);
        assert_close(&body["statistics"]["maxConfidence"], 0.83);

        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_data_uri_payload_accepted() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let payload = format!("data:image/png;base64,{}", png_base64(32, 24));
        let (status, body) = send(app, detect_request(json!({ "image": payload }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageSize"], json!({ "width": 32, "height": 24 }));
        assert_eq!(backend.last_call().map(|(w, h, _)| (w, h)), Some((32, 24)));
    }

    #[tokio::test]
    async fn test_line_wrapped_payload_accepted() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let wrapped = png_base64(48, 36)
            .as_bytes()
            .chunks(76)
            .map(|chunk| std::str::from_utf8(chunk).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let (status, body) = send(app, detect_request(json!({ "image": wrapped }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imageSize"], json!({ "width": 48, "height": 36 }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_batches_yields_zero_statistics() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend, &["caries"]);

        let (status, body) = send(app, detect_request(json!({ "image": png_base64(8, 8) }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detections"], json!([]));
        assert_eq!(
            body["statistics"],
            json!({ "totalDetections": 0, "averageConfidence": 0.0, "maxConfidence": 0.0 })
        );
    }

    #[tokio::test]
    async fn test_model_order_and_fallback_label() {
        let backend = FakeBackend::returning(vec![batch(vec![
            prediction([0.0, 0.0, 10.0, 10.0], 0.4, 1),
            prediction([5.0, 5.0, 25.0, 15.0], 0.9, 7),
            prediction([1.0, 2.0, 3.0, 4.0], 0.6, 0),
        ])]);
        let app = app_with(backend, &["caries", "filling"]);

        let (status, body) = send(app, detect_request(json!({ "image": png_base64(64, 64) }))).await;

        assert_eq!(status, StatusCode::OK);
        let classes: Vec<&str> = body["detections"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["class"].as_str().unwrap())
            .collect();
        assert_eq!(classes, vec!["filling", "caries", "caries"]);
        assert_eq!(body["statistics"]["totalDetections"], 3);
        assert_close(&body["statistics"]["maxConfidence"], 0.9);
        assert_close(&body["statistics"]["averageConfidence"], (0.4 + 0.9 + 0.6) / 3.0);
    }

    #[tokio::test]
    async fn test_default_thresholds_passed_to_model() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        send(app, detect_request(json!({ "image": png_base64(16, 16) }))).await;

        let (_, _, thresholds) = backend.last_call().unwrap();
        assert_eq!(thresholds.confidence, 0.20);
        assert_eq!(thresholds.iou, 0.45);
    }

    // =============================================================================
    // Request errors
    // =============================================================================

    #[tokio::test]
    async fn test_missing_image_rejected() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let (status, body) = send(app, detect_request(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errorType"], "invalid_image");
        assert!(body.get("detections").is_none());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let (status, body) = send(app, detect_request(json!({ "image": "" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "invalid_image");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_base64_rejected() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let (status, body) = send(app, detect_request(json!({ "image": "@@not base64@@" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errorType"], "invalid_image");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_image_bytes_rejected() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        // "hello world"
        let (status, body) = send(app, detect_request(json!({ "image": "aGVsbG8gd29ybGQ=" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorType"], "invalid_image");
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_structured_error() {
        let backend = FakeBackend::returning(vec![]);
        let app = app_with(backend.clone(), &["caries"]);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/detect")
            .header("content-type", "application/json")
            .body(Body::from("{\"image\": "))
            .unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errorType"], "invalid_request");
        assert_eq!(backend.calls(), 0);
    }

    // =============================================================================
    // Model failures
    // =============================================================================

    #[tokio::test]
    async fn test_unavailable_model_returns_503() {
        let app = create_router(AppState::new(DetectionPipeline::unavailable(
            "Detection model not found: best.onnx",
        )));

        let (status, body) = send(app, detect_request(json!({ "image": png_base64(8, 8) }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["errorType"], "model_unavailable");
        assert!(body["error"].as_str().unwrap().contains("best.onnx"));
    }

    #[tokio::test]
    async fn test_unavailable_model_checked_before_decoding() {
        let app = create_router(AppState::new(DetectionPipeline::unavailable("gone")));

        let (status, body) = send(app, detect_request(json!({ "image": "@@not base64@@" }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errorType"], "model_unavailable");
    }

    #[tokio::test]
    async fn test_inference_failure_does_not_poison_service() {
        let backend = FakeBackend::sequence(vec![
            Err(anyhow::anyhow!("session run failed")),
            Ok(vec![batch(vec![prediction([0.0, 0.0, 4.0, 4.0], 0.5, 0)])]),
        ]);
        let app = app_with(backend.clone(), &["caries"]);

        let (status, body) =
            send(app.clone(), detect_request(json!({ "image": png_base64(8, 8) }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorType"], "inference_error");
        assert!(body["error"].as_str().unwrap().contains("session run failed"));

        let (status, body) = send(app, detect_request(json!({ "image": png_base64(8, 8) }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statistics"]["totalDetections"], 1);

        assert_eq!(backend.calls(), 2);
    }

    // =============================================================================
    // Routing and CORS
    // =============================================================================

    #[tokio::test]
    async fn test_preflight_returns_ok() {
        let app = app_with(FakeBackend::returning(vec![]), &["caries"]);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/detect")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_header_on_detect() {
        let app = app_with(FakeBackend::returning(vec![]), &["caries"]);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/detect")
            .header("content-type", "application/json")
            .header("origin", "http://localhost:3000")
            .body(Body::from(json!({ "image": png_base64(8, 8) }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_get_detect_not_allowed() {
        let app = app_with(FakeBackend::returning(vec![]), &["caries"]);

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/detect")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
