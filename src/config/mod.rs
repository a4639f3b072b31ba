// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration.
//!
//! All values are read once from environment variables at startup; there is
//! no hot reload. Unset or unparseable values fall back to the defaults
//! below.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Compute device for ONNX inference.
///
/// `Auto` tries the CUDA execution provider first and falls back to CPU if
/// it is unavailable. `Cuda` requires a working CUDA provider and fails the
/// model load otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
    Auto,
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            "auto" => Ok(Device::Auto),
            other => Err(format!("unknown device '{}'", other)),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
            Device::Auto => write!(f, "auto"),
        }
    }
}

/// Service configuration, read once at startup via [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server
    pub host: String,

    /// Bind port for the HTTP server
    pub port: u16,

    /// Embedding model name (e.g., "all-MiniLM-L6-v2")
    pub model_name: String,

    /// Directory containing per-model subdirectories with the ONNX model
    /// and tokenizer files
    pub models_dir: PathBuf,

    /// Compute device for inference
    pub device: Device,

    /// Maximum tokens the model will process per text (truncation boundary)
    pub max_seq_length: usize,

    /// Upper bound on texts per batch request
    pub max_batch_size: usize,

    /// Internal mini-batch size used by the model for memory efficiency
    pub encode_batch_size: usize,

    /// L2-normalize output vectors
    pub normalize_embeddings: bool,

    /// Maximum number of cached embedding vectors
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_name: "all-MiniLM-L6-v2".to_string(),
            models_dir: PathBuf::from("./models"),
            device: Device::Cpu,
            max_seq_length: 256,
            max_batch_size: 512,
            encode_batch_size: 64,
            normalize_embeddings: true,
            cache_capacity: 2000,
        }
    }
}

impl Config {
    /// Builds a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            model_name: env::var("MODEL_NAME").unwrap_or(defaults.model_name),
            models_dir: env::var("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            device: env::var("DEVICE")
                .ok()
                .and_then(|v| v.parse::<Device>().ok())
                .unwrap_or(defaults.device),
            max_seq_length: env::var("MAX_SEQ_LENGTH")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.max_seq_length),
            max_batch_size: env::var("MAX_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.max_batch_size),
            encode_batch_size: env::var("ENCODE_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.encode_batch_size),
            normalize_embeddings: env::var("NORMALIZE_EMBEDDINGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.normalize_embeddings),
            cache_capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.cache_capacity),
        }
    }

    /// Path to the ONNX model file for the configured model
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_name).join("model.onnx")
    }

    /// Path to the tokenizer JSON file for the configured model
    pub fn tokenizer_path(&self) -> PathBuf {
        self.models_dir
            .join(&self.model_name)
            .join("tokenizer.json")
    }
}
