// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod version;

// Re-export main types
pub use cache::{CacheStats, EmbeddingCache};
pub use config::{Config, Device};
pub use embeddings::{EmbeddingEngine, EmbeddingModel, EngineError};
