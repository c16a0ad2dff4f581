// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime backend for exported YOLO detectors
//!
//! Loads an Ultralytics-style `.onnx` export and runs it on CPU.

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::backend::DetectionBackend;
use super::postprocess::postprocess;
use super::preprocessing::{letterbox, DEFAULT_INPUT_SIZE};
use super::types::{InferenceThresholds, PredictionBatch};
use crate::vision::image_utils::CanonicalImage;

/// YOLO detector backed by an ONNX Runtime session
///
/// `Session::run` needs exclusive access, so concurrent requests queue on
/// the session mutex.
#[derive(Clone)]
pub struct YoloOnnxModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Square input edge the model was exported with
    input_size: u32,
}

impl std::fmt::Debug for YoloOnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloOnnxModel")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloOnnxModel {
    /// Load a detector from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Detection model input: {} {:?}", input.name, input.input_type);
        }

        let input_size = if input_size == 0 {
            DEFAULT_INPUT_SIZE
        } else {
            input_size
        };

        info!(
            "✅ Detection model loaded (CPU-only, input {}x{})",
            input_size, input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            input_size,
        })
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl DetectionBackend for YoloOnnxModel {
    fn predict(
        &self,
        image: &CanonicalImage,
        thresholds: InferenceThresholds,
    ) -> Result<Vec<PredictionBatch>> {
        let (tensor, letterbox_info) = letterbox(image.pixels(), self.input_size);

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let mut session = lock_session(&self.session);

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        let predictions = postprocess(output_tensor.view(), &letterbox_info, thresholds)?;

        Ok(vec![PredictionBatch { predictions }])
    }
}

/// Acquire the session even if an earlier holder panicked
///
/// The session carries no state between runs, so a panic mid-request leaves
/// nothing half-updated for the next caller.
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(|poisoned| {
        warn!("Detection session lock was poisoned by a panicked request, recovering");
        PoisonError::into_inner(poisoned)
    })
}
