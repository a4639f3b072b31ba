// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP server: router construction and startup.
//!
//! Endpoints:
//!     GET  /health        - readiness probe
//!     POST /embed-query   - embed a single search query
//!     POST /embed-batch   - embed a batch of documents

use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::embed::{embed_batch_handler, embed_query_handler, HealthResponse};
use crate::config::Config;
use crate::embeddings::EmbeddingEngine;
use crate::version;

/// Shared router state. The engine is loaded before the server binds, so
/// plain `Arc` sharing suffices; the only interior mutability is the
/// engine's cache lock.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EmbeddingEngine>,
}

/// Builds the service router. Split from [`start_server`] so tests can
/// drive it with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/embed-query", post(embed_query_handler))
        .route("/embed-batch", post(embed_batch_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Binds the configured address and serves until the process exits.
pub async fn start_server(engine: Arc<EmbeddingEngine>, config: &Config) -> Result<()> {
    let app = build_router(AppState { engine });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT configuration")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    tracing::info!("{} listening on {}", version::get_version_string(), addr);

    axum::serve(listener, app).await.context("Server error")
}

/// GET /health: readiness and model status
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let loaded = state.engine.is_loaded();
    Json(HealthResponse {
        status: if loaded { "ok" } else { "unavailable" }.to_string(),
        model_loaded: loaded,
        model_name: state.engine.model_name().to_string(),
        embedding_dimension: state.engine.dimension(),
        version: version::VERSION_NUMBER.to_string(),
        cache_stats: loaded.then(|| state.engine.cache_stats()),
    })
}
