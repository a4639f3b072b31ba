// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding engine: model lifecycle, request cache, batch policy.
//!
//! One engine instance is constructed at process startup, loads its model
//! exactly once before the HTTP server binds, and is then shared read-only
//! (`Arc`) across every request handler. There is no global singleton; the
//! entry point owns the engine and injects it into the router state.
//!
//! The single-text path consults the cache before the model and caches
//! every fresh result. The batch path never touches the cache: batch calls
//! are bulk-ingest traffic with low repeat rates, and per-item lookups
//! would forfeit the throughput of one vectorized inference call.

use anyhow::Result;
use std::sync::Mutex;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::cache::{CacheStats, EmbeddingCache};
use crate::config::Config;
use crate::embeddings::EmbeddingModel;

/// Typed failures surfaced by the engine's encode operations.
///
/// These are never logged-and-swallowed; every failure is returned
/// synchronously to the triggering call, and nothing is retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Encode requested before `load_model` completed. The HTTP layer maps
    /// this to 503; it never stands in for an empty result.
    #[error("Model is not loaded yet")]
    NotReady,

    /// Batch request above the configured limit. Nothing is partially
    /// processed.
    #[error("Batch size {size} exceeds limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    /// Failure inside tokenization or model inference.
    #[error("Embedding computation failed: {0:#}")]
    Encode(#[source] anyhow::Error),
}

/// Embedding engine combining one model with one request cache.
///
/// Two states: UNLOADED (`model` is `None`, right after construction) and
/// LOADED (after `load_model`). Encode operations in UNLOADED return
/// [`EngineError::NotReady`].
pub struct EmbeddingEngine {
    config: Config,
    model: Option<EmbeddingModel>,
    cache: Mutex<EmbeddingCache>,
}

impl EmbeddingEngine {
    /// Creates an UNLOADED engine with a fresh cache sized from config.
    pub fn new(config: Config) -> Self {
        let cache = Mutex::new(EmbeddingCache::new(config.cache_capacity));
        Self {
            config,
            model: None,
            cache,
        }
    }

    /// Loads the configured model. Must complete before traffic is
    /// accepted; a failure here is fatal to startup and is not retried.
    ///
    /// Calling again reloads the model and replaces the dimensionality.
    /// Startup is single-threaded, so no concurrent-load guard is needed.
    pub async fn load_model(&mut self) -> Result<()> {
        let start = Instant::now();
        info!(
            "Loading model '{}' on device '{}'",
            self.config.model_name, self.config.device
        );

        let model = EmbeddingModel::load(
            self.config.model_name.clone(),
            self.config.model_path(),
            self.config.tokenizer_path(),
            self.config.device,
            self.config.max_seq_length,
            self.config.encode_batch_size,
        )
        .await?;

        info!(
            "Model loaded in {:.2}s | dimension={} | max_seq_length={}",
            start.elapsed().as_secs_f64(),
            model.dimension(),
            model.max_seq_length()
        );

        self.model = Some(model);
        Ok(())
    }

    /// True once `load_model` has completed
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Probed model dimension, or 0 while unloaded
    pub fn dimension(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.dimension())
    }

    /// Configured model name
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Encodes a single text, consulting the cache first.
    ///
    /// A hit returns the stored vector without any model work. A miss runs
    /// a one-element inference and caches the result, so every successful
    /// single encode is cached.
    pub async fn encode_single(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotReady)?;

        if let Some(cached) = self.cache.lock().unwrap().get(text) {
            return Ok(cached);
        }

        let input = [text.to_string()];
        let embeddings = model
            .encode(&input, self.config.normalize_embeddings)
            .await
            .map_err(EngineError::Encode)?;
        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Encode(anyhow::anyhow!("Model returned no embedding")))?;

        self.cache.lock().unwrap().put(text, embedding.clone());
        Ok(embedding)
    }

    /// Encodes a batch of texts in one model call, in input order.
    ///
    /// The batch-size limit is enforced before the model is touched, so an
    /// oversized batch is rejected even on an unloaded engine. The model
    /// handles internal mini-batching itself; this layer neither consults
    /// nor populates the cache.
    pub async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        if texts.len() > self.config.max_batch_size {
            return Err(EngineError::BatchTooLarge {
                size: texts.len(),
                limit: self.config.max_batch_size,
            });
        }

        let model = self.model.as_ref().ok_or(EngineError::NotReady)?;

        let start = Instant::now();
        let embeddings = model
            .encode(texts, self.config.normalize_embeddings)
            .await
            .map_err(EngineError::Encode)?;
        let elapsed = start.elapsed().as_secs_f64();

        info!(
            "Encoded {} texts in {:.3}s ({:.1} texts/s)",
            texts.len(),
            elapsed,
            if elapsed > 0.0 {
                texts.len() as f64 / elapsed
            } else {
                0.0
            }
        );

        Ok(embeddings)
    }

    /// Snapshot of the cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().unwrap().stats()
    }
}
