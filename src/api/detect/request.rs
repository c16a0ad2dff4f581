// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect request type and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Request for single-image detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Base64 image, optionally prefixed with `data:<mime>;base64,`
    #[serde(default)]
    pub image: Option<String>,
}

impl DetectRequest {
    /// Reject a missing or empty `image` before any decoding
    pub fn validate(&self) -> Result<&str, ApiError> {
        match self.image.as_deref() {
            Some(image) if !image.trim().is_empty() => Ok(image),
            _ => Err(ApiError::InvalidImage("No image provided".to_string())),
        }
    }
}
