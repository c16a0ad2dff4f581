// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration from CLI flags and environment

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::vision::detection::DEFAULT_INPUT_SIZE;
use crate::vision::DetectionModelConfig;

/// Fabstir Detect Node
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-detect-node")]
#[command(version)]
#[command(about = "Single-image object detection service", long_about = None)]
pub struct NodeConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    /// ONNX export of the trained detector
    #[arg(long, env = "MODEL_PATH", default_value = "best.onnx")]
    pub model_path: PathBuf,

    /// Class names, one per line, index order
    #[arg(long, env = "CLASS_NAMES_PATH")]
    pub class_names_path: Option<PathBuf>,

    /// Square model input edge in pixels
    #[arg(long, env = "MODEL_INPUT_SIZE", default_value_t = DEFAULT_INPUT_SIZE)]
    pub input_size: u32,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl NodeConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .context(format!("Invalid HOST address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn model_config(&self) -> DetectionModelConfig {
        DetectionModelConfig {
            model_path: self.model_path.clone(),
            class_names_path: self.class_names_path.clone(),
            input_size: self.input_size,
            intra_threads: self.intra_threads,
        }
    }
}
