// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::detect::detect_handler;
use super::handlers::health_handler;
use crate::vision::DetectionService;

/// Room for multipart boundaries and part headers on top of the image bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub detection_service: Arc<DetectionService>,
    /// Allowed CORS origins, `*` mirrors any origin
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(detection_service: Arc<DetectionService>) -> Self {
        Self {
            detection_service,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = origins;
        self
    }
}

/// Build the router with all routes and layers
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.detection_service.limits().max_bytes + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&state.cors_allowed_origins);

    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Object detection
        .route("/detect/", post(detect_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: permissive with credentials unless explicit origins are given
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
