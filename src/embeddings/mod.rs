// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding engine and ONNX model wrapper.
//!
//! [`EmbeddingModel`] owns the ONNX session and tokenizer; the
//! [`EmbeddingEngine`] composes it with the LRU cache and enforces the
//! batch-size policy.

pub mod engine;
pub mod model;

pub use engine::{EmbeddingEngine, EngineError};
pub use model::EmbeddingModel;
