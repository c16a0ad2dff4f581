// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_detect_node::{
    api::{start_server, AppState},
    vision::{DetectionPipeline, ModelState},
    NodeConfig,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = NodeConfig::parse();

    tracing::info!("🚀 Starting {}", fabstir_detect_node::version::get_version_string());
    tracing::info!("📦 BUILD VERSION: {}", fabstir_detect_node::version::VERSION);

    let addr = config.socket_addr()?;

    // Load once; a failed load keeps the server up in degraded mode
    let model_config = config.model_config();
    let state = tokio::task::spawn_blocking(move || ModelState::load(&model_config)).await?;
    if !state.is_loaded() {
        tracing::warn!("⚠️ Serving without a detection model, /api/detect will return 503");
    }

    let app_state = AppState::new(DetectionPipeline::new(state));
    start_server(addr, app_state).await
}
