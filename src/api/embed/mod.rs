// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API module: request/response types and handlers for the
//! /embed-query and /embed-batch endpoints.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{embed_batch_handler, embed_query_handler};
pub use request::{EmbedBatchRequest, EmbedQueryRequest, MAX_TEXT_CHARS};
pub use response::{EmbedBatchResponse, EmbedQueryResponse, HealthResponse};
