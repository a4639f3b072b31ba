// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP handlers for the embedding endpoints.
//!
//! Thin marshalling over the engine: validate input, gate on readiness,
//! call the engine, shape the response. All policy (caching, batch limits,
//! normalization) lives in the engine.

use axum::extract::State;
use axum::Json;

use crate::api::embed::{
    EmbedBatchRequest, EmbedBatchResponse, EmbedQueryRequest, EmbedQueryResponse,
};
use crate::api::http_server::AppState;
use crate::api::ApiError;

/// POST /embed-query: embed a single text (typically a search query)
pub async fn embed_query_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbedQueryRequest>,
) -> Result<Json<EmbedQueryResponse>, ApiError> {
    request.validate()?;

    // Readiness is surfaced by the engine as a typed NotReady error and
    // mapped to 503 here, never to an empty result.
    let embedding = state.engine.encode_single(&request.text).await?;

    Ok(Json(EmbedQueryResponse {
        embedding,
        dimension: state.engine.dimension(),
        model: state.engine.model_name().to_string(),
    }))
}

/// POST /embed-batch: embed a batch of texts (typically documents)
pub async fn embed_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbedBatchRequest>,
) -> Result<Json<EmbedBatchResponse>, ApiError> {
    request.validate()?;

    // The engine enforces the batch-size limit (with the configured value)
    // before any model work, and reports NotReady when unloaded.
    let embeddings = state.engine.encode_batch(&request.texts).await?;

    Ok(Json(EmbedBatchResponse {
        count: embeddings.len(),
        embeddings,
        dimension: state.engine.dimension(),
        model: state.engine.model_name().to_string(),
    }))
}
