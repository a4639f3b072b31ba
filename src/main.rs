// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process entry point.
//!
//! Loads the embedding model once, before the server starts accepting
//! traffic. A load failure aborts startup; it is never retried.

use anyhow::Result;
use embedding_service::api;
use embedding_service::config::Config;
use embedding_service::embeddings::EmbeddingEngine;
use embedding_service::version;
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());

    let config = Config::from_env();
    info!(
        "Configuration: model={}, device={}, max_batch_size={}, cache_capacity={}",
        config.model_name, config.device, config.max_batch_size, config.cache_capacity
    );

    // The engine is constructed and loaded here, then shared read-only with
    // every request handler. Load must complete before the socket binds.
    let mut engine = EmbeddingEngine::new(config.clone());
    engine.load_model().await?;

    api::start_server(Arc::new(engine), &config).await
}
