// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX sentence-transformer wrapper.
//!
//! Wraps ONNX Runtime to run a sentence-embedding model (default
//! all-MiniLM-L6-v2) for single and batch encoding:
//! - model and tokenizer loading from disk
//! - device selection with CUDA-to-CPU fallback in auto mode
//! - tokenization with truncation at the configured boundary
//! - attention-mask mean pooling over token embeddings
//! - optional L2 normalization of the pooled vectors
//! - output dimensionality probed at load time, never hard-coded

use anyhow::{Context, Result};
use ndarray::{Array2, ArrayView2, Axis};
use ort::ep::{CPU as CPUExecutionProvider, CUDA as CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Encoding, Tokenizer, TruncationParams};
use tracing::{info, warn};

use crate::config::Device;

/// Loaded embedding model.
///
/// Construction is loading: an `EmbeddingModel` value always holds a live
/// ONNX session and a probed output dimension. The engine represents the
/// unloaded state by the absence of this value.
///
/// # Thread Safety
/// The session sits behind `Arc<Mutex>` and the tokenizer behind `Arc`, so
/// the model can be shared cheaply across concurrent request handlers.
#[derive(Clone)]
pub struct EmbeddingModel {
    /// ONNX Runtime session (locked per inference call)
    session: Arc<Mutex<Session>>,

    /// BERT tokenizer, configured to truncate at `max_seq_length`
    tokenizer: Arc<Tokenizer>,

    /// Model name (e.g., "all-MiniLM-L6-v2")
    model_name: String,

    /// Output dimension, probed with a throwaway encode at load time
    dimension: usize,

    /// Truncation boundary in tokens
    max_seq_length: usize,

    /// Internal mini-batch size for memory efficiency
    encode_batch_size: usize,
}

impl std::fmt::Debug for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("max_seq_length", &self.max_seq_length)
            .field("encode_batch_size", &self.encode_batch_size)
            .finish_non_exhaustive()
    }
}

impl EmbeddingModel {
    /// Loads the model and tokenizer from disk onto the requested device.
    ///
    /// Immediately probes output dimensionality by encoding a fixed
    /// throwaway input, so `dimension()` is valid on every returned value.
    ///
    /// # Errors
    /// Returns an error if either file is missing, the session cannot be
    /// built on the requested device, the tokenizer is invalid, or the
    /// probe inference fails. Callers treat this as fatal to startup.
    pub async fn load<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        tokenizer_path: P,
        device: Device,
        max_seq_length: usize,
        encode_batch_size: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let mut session = build_session(model_path, device)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        // Probe dimensionality with a throwaway encode. The dimension is a
        // runtime property of the loaded model, so it is recorded here
        // rather than taken from a per-model table.
        let probe_encoding = tokenizer
            .encode("hello", true)
            .map_err(|e| anyhow::anyhow!("Tokenizer probe failed: {}", e))?;
        let probe = run_inference(&mut session, &[probe_encoding])
            .context("Dimension probe inference failed")?;
        let dimension = probe
            .first()
            .map(|v| v.len())
            .filter(|&d| d > 0)
            .context("Model produced an empty probe embedding")?;

        info!(
            "Embedding model '{}' loaded: dimension={}, max_seq_length={}",
            model_name, dimension, max_seq_length
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension,
            max_seq_length,
            encode_batch_size: encode_batch_size.max(1),
        })
    }

    /// Encodes texts into embedding vectors, one per input, in input order.
    ///
    /// Texts longer than the truncation boundary are truncated by the
    /// tokenizer; nothing is rejected for length. Inputs are run through
    /// the session in internal mini-batches of `encode_batch_size`, which
    /// is invisible to callers. When `normalize` is set, each vector is
    /// scaled to unit L2 norm.
    pub async fn encode(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.encode_batch_size) {
            let encodings: Vec<Encoding> = chunk
                .iter()
                .map(|text| {
                    self.tokenizer
                        .encode(text.as_str(), true)
                        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut batch = {
                let mut session = self.session.lock().unwrap();
                run_inference(&mut session, &encodings)?
            };

            if normalize {
                for embedding in &mut batch {
                    l2_normalize(embedding);
                }
            }

            embeddings.append(&mut batch);
        }

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimension {
                anyhow::bail!(
                    "Unexpected embedding dimension at index {}: {} (expected {})",
                    i,
                    embedding.len(),
                    self.dimension
                );
            }
        }

        Ok(embeddings)
    }

    /// Returns the probed output dimension of this model
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the truncation boundary in tokens
    pub fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }
}

/// Builds an ONNX session for the requested device.
///
/// `Auto` attempts CUDA and falls back to CPU; an explicit `Cuda` request
/// that fails is a hard error so a misconfigured GPU node does not silently
/// serve at CPU speed.
fn build_session(model_path: &Path, device: Device) -> Result<Session> {
    match device {
        Device::Cpu => cpu_session(model_path),
        Device::Cuda => cuda_session(model_path),
        Device::Auto => match cuda_session(model_path) {
            Ok(session) => {
                info!("CUDA execution provider initialized");
                Ok(session)
            }
            Err(e) => {
                warn!("CUDA execution provider failed: {}", e);
                warn!("Falling back to CPU execution provider");
                cpu_session(model_path)
            }
        },
    }
}

fn cpu_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(ort::Error::<()>::from)
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(ort::Error::<()>::from)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .map_err(ort::Error::<()>::from)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load ONNX model from {}",
            model_path.display()
        ))
}

fn cuda_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(ort::Error::<()>::from)
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(ort::Error::<()>::from)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .map_err(ort::Error::<()>::from)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load ONNX model from {}",
            model_path.display()
        ))
}

/// Runs one padded batch through the session and mean-pools the token
/// embeddings into one sentence vector per input.
fn run_inference(session: &mut Session, encodings: &[Encoding]) -> Result<Vec<Vec<f32>>> {
    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|enc| enc.get_ids().len())
        .max()
        .unwrap_or(0);

    // Pad all sequences to the longest in the batch
    let mut input_ids = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids = Vec::with_capacity(batch_size * max_len);

    for encoding in encodings {
        let ids = encoding.get_ids();
        let mask = encoding.get_attention_mask();

        input_ids.extend(ids.iter().map(|&id| id as i64));
        attention_mask.extend(mask.iter().map(|&m| m as i64));
        token_type_ids.extend(std::iter::repeat(0i64).take(ids.len()));

        let padding = max_len - ids.len();
        input_ids.extend(std::iter::repeat(0i64).take(padding));
        attention_mask.extend(std::iter::repeat(0i64).take(padding));
        token_type_ids.extend(std::iter::repeat(0i64).take(padding));
    }

    // Keep the mask for pooling after the arrays are consumed by ort
    let mask_for_pooling = attention_mask.clone();

    let input_ids_array = Array2::from_shape_vec((batch_size, max_len), input_ids)
        .context("Failed to create input_ids array")?;
    let attention_mask_array = Array2::from_shape_vec((batch_size, max_len), attention_mask)
        .context("Failed to create attention_mask array")?;
    let token_type_ids_array = Array2::from_shape_vec((batch_size, max_len), token_type_ids)
        .context("Failed to create token_type_ids array")?;

    let outputs = session.run(ort::inputs![
        "input_ids" => Value::from_array(input_ids_array)?,
        "attention_mask" => Value::from_array(attention_mask_array)?,
        "token_type_ids" => Value::from_array(token_type_ids_array)?
    ])?;

    // Token-level output: [batch, seq_len, hidden_dim]. Indexed by position
    // rather than name since output names vary across exported models.
    let output_array = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;
    let output_shape = output_array.shape();
    if output_shape.len() != 3 {
        anyhow::bail!(
            "Model outputs unexpected shape: {:?} (expected [batch, seq_len, hidden])",
            output_shape
        );
    }

    let mut embeddings = Vec::with_capacity(batch_size);
    for batch_idx in 0..batch_size {
        let token_embeddings = output_array.index_axis(Axis(0), batch_idx);
        let token_embeddings: ArrayView2<f32> = token_embeddings
            .into_dimensionality()
            .context("Failed to view token embeddings as 2-D")?;
        let mask = &mask_for_pooling[batch_idx * max_len..(batch_idx + 1) * max_len];
        embeddings.push(mean_pool(token_embeddings, mask));
    }

    Ok(embeddings)
}

/// Mean pooling over the sequence dimension, weighted by the attention
/// mask so padding tokens do not contribute.
fn mean_pool(token_embeddings: ArrayView2<f32>, attention_mask: &[i64]) -> Vec<f32> {
    let seq_len = token_embeddings.shape()[0];
    let hidden_dim = token_embeddings.shape()[1];

    let mut pooled = vec![0.0f32; hidden_dim];
    let mut mask_sum = 0.0f32;

    for i in 0..seq_len {
        let mask_value = attention_mask[i] as f32;
        mask_sum += mask_value;
        for j in 0..hidden_dim {
            pooled[j] += token_embeddings[[i, j]] * mask_value;
        }
    }

    for value in &mut pooled {
        *value /= mask_sum.max(1e-9);
    }

    pooled
}

/// Scales a vector to unit L2 norm in place. Zero vectors are left as-is.
fn l2_normalize(embedding: &mut [f32]) {
    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in embedding.iter_mut() {
            *value /= norm;
        }
    }
}
