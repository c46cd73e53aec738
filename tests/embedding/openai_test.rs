//! OpenAI embedder tests against a one-shot fake server.

use std::time::Duration;

use mailvoice::embedding::openai::OpenAiEmbedder;
use mailvoice::embedding::{Embedder, EmbedderError};

use crate::support::{received_json, serve_once};

fn embedder(base_url: &str, dims: usize) -> OpenAiEmbedder {
    match OpenAiEmbedder::new(
        "text-embedding-3-small",
        "sk-test".to_owned(),
        dims,
        Duration::from_secs(5),
    ) {
        Ok(embedder) => embedder.with_base_url(base_url),
        Err(err) => panic!("embedder should build: {err}"),
    }
}

#[test]
fn empty_key_is_rejected() {
    match OpenAiEmbedder::new("m", "  ".to_owned(), 3, Duration::from_secs(1)) {
        Err(EmbedderError::Unavailable(_)) => {}
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[test]
fn debug_redacts_key() {
    let debug = format!("{:?}", embedder("http://localhost", 3));
    assert!(debug.contains("[REDACTED]"));
    assert!(!debug.contains("sk-test"));
}

#[tokio::test]
async fn embed_requests_configured_dimensions() {
    let (url, server) = serve_once("200 OK", r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#).await;

    match embedder(&url, 3).embed("Subject: hi").await {
        Ok(vector) => assert_eq!(vector, vec![0.1, 0.2, 0.3]),
        Err(err) => panic!("embed should succeed: {err}"),
    }

    let sent = received_json(server).await;
    assert_eq!(sent["model"], "text-embedding-3-small");
    assert_eq!(sent["dimensions"], 3);
    assert_eq!(sent["input"][0], "Subject: hi");
}

#[tokio::test]
async fn dimension_mismatch_is_parse_error() {
    let (url, _server) = serve_once("200 OK", r#"{"data":[{"embedding":[0.1,0.2]}]}"#).await;
    match embedder(&url, 3).embed("x").await {
        Err(EmbedderError::Parse(msg)) => assert!(msg.contains("expected 3")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_unavailable_and_sanitised() {
    let (url, _server) = serve_once(
        "401 Unauthorized",
        r#"{"error":"bad key sk-proj-abcdefghijklmnopqrstuv"}"#,
    )
    .await;
    match embedder(&url, 3).embed("x").await {
        Err(EmbedderError::Unavailable(msg)) => {
            assert!(msg.contains("401"));
            assert!(!msg.contains("sk-proj-abcdefghijklmnopqrstuv"));
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}
