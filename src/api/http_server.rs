// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::detect_handler;
use crate::vision::DetectionPipeline;

/// Largest accepted request body (base64 inflates the 10MB image cap)
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
}

impl AppState {
    pub fn new(pipeline: DetectionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Detection endpoint
        .route(
            "/api/detect",
            post(detect_handler).options(preflight_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Liveness only; does not depend on model state
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}
