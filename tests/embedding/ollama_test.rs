//! Tests for the Ollama embedder.

use std::time::Duration;

use mailvoice::embedding::ollama::OllamaEmbedder;
use mailvoice::embedding::Embedder;

use crate::support::{received_json, serve_once};

fn embedder(base_url: &str, dims: usize) -> OllamaEmbedder {
    match OllamaEmbedder::with_base_url("nomic-embed-text", base_url, dims, Duration::from_secs(5)) {
        Ok(embedder) => embedder,
        Err(err) => panic!("embedder should build: {err}"),
    }
}

#[test]
fn ollama_embedder_reports_correct_dimensions() {
    assert_eq!(embedder("http://custom:1234", 384).dimensions(), 384);
}

#[test]
fn ollama_embedder_debug_includes_model_and_base_url() {
    let debug = format!("{:?}", embedder("http://custom:9999/", 512));
    assert!(debug.contains("nomic-embed-text"));
    assert!(debug.contains("http://custom:9999"));
    assert!(!debug.contains("9999/"));
}

#[tokio::test]
async fn ollama_embedder_posts_to_embed_endpoint() {
    let (url, server) = serve_once("200 OK", r#"{"embeddings":[[0.5,0.25]]}"#).await;

    match embedder(&url, 2).embed("hello").await {
        Ok(vector) => assert_eq!(vector, vec![0.5, 0.25]),
        Err(err) => panic!("embed should succeed: {err}"),
    }

    let sent = received_json(server).await;
    assert_eq!(sent["model"], "nomic-embed-text");
    assert_eq!(sent["input"], "hello");
}

#[tokio::test]
async fn ollama_embedder_returns_error_when_unavailable() {
    let result = embedder("http://127.0.0.1:1", 768).embed("test text").await;
    assert!(result.is_err(), "should fail when Ollama is unreachable");
}
