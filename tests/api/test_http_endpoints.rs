// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Router-level tests driven with tower's `oneshot`. These use an unloaded
//! engine, so they run without model files: readiness gating, request
//! validation, and the health payload shape.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::util::ServiceExt;

use embedding_service::api::{build_router, AppState};
use embedding_service::config::Config;
use embedding_service::embeddings::EmbeddingEngine;

fn test_router(config: Config) -> axum::Router {
    build_router(AppState {
        engine: Arc::new(EmbeddingEngine::new(config)),
    })
}

fn json_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_unloaded_model() {
    let response = test_router(Config::default())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "unavailable");
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["model_name"], "all-MiniLM-L6-v2");
    assert_eq!(json["embedding_dimension"], 0);
    assert_eq!(json["version"], "1.0.0");
    assert!(json.get("cache_stats").is_none());
}

#[tokio::test]
async fn test_embed_query_unloaded_returns_503() {
    let response = test_router(Config::default())
        .oneshot(json_post("/embed-query", r#"{"text": "hello"}"#.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["error_type"], "service_unavailable");
}

#[tokio::test]
async fn test_embed_query_rejects_empty_text() {
    let response = test_router(Config::default())
        .oneshot(json_post("/embed-query", r#"{"text": "   "}"#.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "text");
}

#[tokio::test]
async fn test_embed_query_rejects_oversized_text() {
    let body = serde_json::json!({ "text": "x".repeat(10_001) }).to_string();
    let response = test_router(Config::default())
        .oneshot(json_post("/embed-query", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
}

#[tokio::test]
async fn test_embed_batch_rejects_empty_texts() {
    let response = test_router(Config::default())
        .oneshot(json_post("/embed-batch", r#"{"texts": []}"#.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "texts");
}

#[tokio::test]
async fn test_embed_batch_unloaded_returns_503() {
    let response = test_router(Config::default())
        .oneshot(json_post(
            "/embed-batch",
            r#"{"texts": ["a", "b"]}"#.to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_embed_batch_over_limit_returns_422() {
    let config = Config {
        max_batch_size: 4,
        ..Config::default()
    };
    let texts: Vec<String> = (0..5).map(|i| format!("text-{}", i)).collect();
    let body = serde_json::json!({ "texts": texts }).to_string();

    let response = test_router(config)
        .oneshot(json_post("/embed-batch", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = body_json(response).await;
    assert_eq!(json["error_type"], "batch_too_large");
    assert_eq!(json["details"]["size"], 5);
    assert_eq!(json["details"]["limit"], 4);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = test_router(Config::default())
        .oneshot(
            Request::builder()
                .uri("/embed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
