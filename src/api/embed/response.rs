// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response types for the embedding endpoints and the health probe.

use crate::cache::CacheStats;
use serde::{Deserialize, Serialize};

/// Response body for POST /embed-query
///
/// # Example
/// ```json
/// {
///   "embedding": [0.1, 0.2, ...],
///   "dimension": 384,
///   "model": "all-MiniLM-L6-v2"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedQueryResponse {
    /// L2-normalized embedding vector
    pub embedding: Vec<f32>,

    /// Dimensionality of the embedding
    pub dimension: usize,

    /// Name of the model used
    pub model: String,
}

/// Response body for POST /embed-batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedBatchResponse {
    /// One L2-normalized vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,

    /// Dimensionality of each embedding
    pub dimension: usize,

    /// Number of embeddings returned
    pub count: usize,

    /// Name of the model used
    pub model: String,
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when the model is loaded, "unavailable" otherwise
    pub status: String,

    pub model_loaded: bool,

    pub model_name: String,

    /// Probed model dimension, 0 while unloaded
    pub embedding_dimension: usize,

    /// Service version
    pub version: String,

    /// Cache counters, present only once the model is loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_stats: Option<CacheStats>,
}
