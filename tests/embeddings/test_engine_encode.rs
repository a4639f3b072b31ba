// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Engine encode-path tests against real model files: cache interaction,
//! batch/single equivalence, batch limits at the boundary.
//!
//! Marked #[ignore]; run with model files downloaded under ./models:
//! cargo test -- --ignored

use embedding_service::config::{Config, Device};
use embedding_service::embeddings::{EmbeddingEngine, EngineError};

async fn loaded_engine(max_batch_size: usize) -> EmbeddingEngine {
    let config = Config {
        device: Device::Cpu,
        max_batch_size,
        ..Config::default()
    };
    let mut engine = EmbeddingEngine::new(config);
    engine
        .load_model()
        .await
        .expect("Failed to load model (download it under ./models first)");
    engine
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_load_transitions_to_loaded() {
    let engine = loaded_engine(512).await;

    assert!(engine.is_loaded());
    assert!(engine.dimension() > 0);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_second_single_encode_is_a_cache_hit() {
    let engine = loaded_engine(512).await;
    let text = "the cache makes repeated queries free";

    let first = engine.encode_single(text).await.unwrap();
    let stats_after_first = engine.cache_stats();

    let second = engine.encode_single(text).await.unwrap();
    let stats_after_second = engine.cache_stats();

    // Bit-identical result served from the cache
    assert_eq!(first, second);
    assert_eq!(stats_after_second.hits, stats_after_first.hits + 1);
    assert_eq!(stats_after_second.misses, stats_after_first.misses);
    assert_eq!(stats_after_second.size, stats_after_first.size);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_single_batch_equivalence() {
    let engine = loaded_engine(512).await;
    let text = "one text, two code paths".to_string();

    let single = engine.encode_single(&text).await.unwrap();
    let batch = engine.encode_batch(&[text]).await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0], single);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_batch_path_bypasses_cache() {
    let engine = loaded_engine(512).await;

    let texts: Vec<String> = (0..3).map(|i| format!("bulk document {}", i)).collect();
    engine.encode_batch(&texts).await.unwrap();

    // The batch path neither populates nor reads the cache
    let stats = engine.cache_stats();
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_batch_at_exact_limit_succeeds() {
    let limit = 8;
    let engine = loaded_engine(limit).await;

    let texts: Vec<String> = (0..limit).map(|i| format!("text {}", i)).collect();
    let embeddings = engine.encode_batch(&texts).await.unwrap();
    assert_eq!(embeddings.len(), limit);

    let over: Vec<String> = (0..limit + 1).map(|i| format!("text {}", i)).collect();
    let result = engine.encode_batch(&over).await;
    assert!(matches!(result, Err(EngineError::BatchTooLarge { .. })));
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_normalization_invariant_end_to_end() {
    let engine = loaded_engine(512).await;

    let texts: Vec<String> = (0..4).map(|i| format!("normalized vector {}", i)).collect();
    let embeddings = engine.encode_batch(&texts).await.unwrap();

    for embedding in &embeddings {
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    let single = engine.encode_single("a single normalized query").await.unwrap();
    let norm = single.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}
