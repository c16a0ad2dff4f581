// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection model loading
//!
//! The model is loaded once at startup into a [`ModelState`]. A failed load
//! leaves the process serving (health checks keep working) while every
//! detection request reports the recorded reason.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::vision::detection::{ClassNames, DetectionBackend, YoloOnnxModel, DEFAULT_INPUT_SIZE};

/// Configuration for loading the detection model
#[derive(Debug, Clone)]
pub struct DetectionModelConfig {
    /// Path to the ONNX export
    pub model_path: PathBuf,
    /// Optional newline-separated class table
    pub class_names_path: Option<PathBuf>,
    /// Square model input edge
    pub input_size: u32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectionModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("best.onnx"),
            class_names_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            intra_threads: 4,
        }
    }
}

/// A loaded model and its class table. Immutable once built.
#[derive(Clone)]
pub struct DetectionModel {
    name: String,
    backend: Arc<dyn DetectionBackend>,
    class_names: ClassNames,
}

impl std::fmt::Debug for DetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionModel")
            .field("name", &self.name)
            .field("class_names", &self.class_names)
            .finish_non_exhaustive()
    }
}

impl DetectionModel {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn DetectionBackend>,
        class_names: ClassNames,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            class_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &dyn DetectionBackend {
        self.backend.as_ref()
    }

    pub fn class_names(&self) -> &ClassNames {
        &self.class_names
    }
}

/// Outcome of the one startup load attempt
#[derive(Debug, Clone)]
pub enum ModelState {
    Loaded(DetectionModel),
    FailedToLoad { reason: String },
}

impl ModelState {
    /// Load the configured model; never fails, degrades instead
    pub fn load(config: &DetectionModelConfig) -> Self {
        match load_model(config) {
            Ok(model) => {
                info!(
                    "✅ Detection model '{}' loaded with {} classes",
                    model.name(),
                    model.class_names().len()
                );
                ModelState::Loaded(model)
            }
            Err(e) => {
                warn!(
                    "⚠️ Failed to load detection model from {}: {:#}",
                    config.model_path.display(),
                    e
                );
                ModelState::FailedToLoad {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    pub fn model(&self) -> Option<&DetectionModel> {
        match self {
            ModelState::Loaded(model) => Some(model),
            ModelState::FailedToLoad { .. } => None,
        }
    }
}

fn load_model(config: &DetectionModelConfig) -> Result<DetectionModel> {
    let class_names = match &config.class_names_path {
        Some(path) => ClassNames::from_file(path)?,
        None => {
            warn!("No class names configured, every detection will use the fallback label");
            ClassNames::default()
        }
    };

    let backend = YoloOnnxModel::new(&config.model_path, config.input_size, config.intra_threads)?;

    let name = config
        .model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "detector".to_string());

    Ok(DetectionModel::new(name, Arc::new(backend), class_names))
}
