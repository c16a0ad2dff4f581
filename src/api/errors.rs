// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::DetectionError;

/// Failure body: `success` is always false, no detection data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_type: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    InvalidImage(String),
    ModelUnavailable(String),
    InferenceFailed(String),
    InternalError(String),
}

impl ApiError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::InvalidImage(_) => "invalid_image",
            ApiError::ModelUnavailable(_) => "model_unavailable",
            ApiError::InferenceFailed(_) => "inference_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::InvalidImage(_) => 400,
            ApiError::ModelUnavailable(_) => 503,
            ApiError::InferenceFailed(_) | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::ModelUnavailable(msg) => write!(f, "Detection model unavailable: {}", msg),
            ApiError::InferenceFailed(msg) => write!(f, "Inference failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::InvalidImage(e) => ApiError::InvalidImage(e.to_string()),
            DetectionError::ModelUnavailable(reason) => ApiError::ModelUnavailable(reason),
            DetectionError::Inference(msg) => ApiError::InferenceFailed(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
