// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request types for the embedding endpoints, with validation.
//!
//! These checks are the caller-side input constraints: text length bounds
//! and non-empty batches. The batch-size upper bound is enforced by the
//! engine itself, not here, so it is applied with the configured limit
//! rather than a constant baked into the API layer.

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Maximum characters accepted for a single query text
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Request body for POST /embed-query
///
/// # Example
/// ```json
/// { "text": "What is semantic search?" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedQueryRequest {
    /// The text to embed (1-10,000 characters, typically a search query)
    pub text: String,
}

impl EmbedQueryRequest {
    /// Validates the single-query request
    ///
    /// # Validation Rules
    /// 1. text cannot be empty or whitespace-only
    /// 2. text cannot exceed 10,000 characters
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "text".to_string(),
                message: "text cannot be empty or contain only whitespace".to_string(),
            });
        }

        let chars = self.text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(ApiError::ValidationError {
                field: "text".to_string(),
                message: format!(
                    "text cannot exceed {} characters (got {})",
                    MAX_TEXT_CHARS, chars
                ),
            });
        }

        Ok(())
    }
}

/// Request body for POST /embed-batch
///
/// # Example
/// ```json
/// { "texts": ["MongoDB is a document database.", "Semantic search uses vector embeddings."] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedBatchRequest {
    /// Texts to embed (at least 1; the upper bound is the engine's
    /// configured MAX_BATCH_SIZE, typically documents being ingested)
    pub texts: Vec<String>,
}

impl EmbedBatchRequest {
    /// Validates the batch request
    ///
    /// # Validation Rules
    /// 1. texts must contain at least 1 item
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.texts.is_empty() {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: "texts array must contain at least 1 item".to_string(),
            });
        }

        Ok(())
    }
}
