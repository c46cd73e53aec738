//! HTTP response classification and sanitisation tests.

use mailvoice::providers::{check_http_response, sanitize_http_error_body, ProviderError};

use crate::support::serve_once;

async fn checked(status_line: &str, body: &str) -> Result<String, ProviderError> {
    let (url, _server) = serve_once(status_line, body).await;
    let response = match reqwest::get(url).await {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };
    check_http_response(response).await
}

#[tokio::test]
async fn check_http_response_redacts_token_like_values() {
    let raw_token = "sk-proj-abcdefghijklmnopqrstuvwxyz1234";
    let result = checked("500 Internal Server Error", &format!("error key={raw_token}")).await;

    match result {
        Err(ProviderError::HttpStatus { status, body }) => {
            assert_eq!(status, 500);
            assert!(!body.contains(raw_token));
            assert!(body.contains("[REDACTED]"));
        }
        other => panic!("expected http status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn check_http_response_truncates_long_error_body() {
    let result = checked("500 Internal Server Error", &"x".repeat(400)).await;

    match result {
        Err(ProviderError::HttpStatus { body, .. }) => {
            assert!(body.ends_with("...[truncated]"));
        }
        other => panic!("expected http status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn check_http_response_classifies_rate_limits() {
    let result = checked("429 Too Many Requests", r#"{"error":"quota"}"#).await;

    match result {
        Err(err @ ProviderError::RateLimited { .. }) => assert!(err.is_retryable()),
        other => panic!("expected rate limit, got: {other:?}"),
    }
}

#[tokio::test]
async fn check_http_response_returns_body_on_success() {
    let result = checked("200 OK", r#"{"ok":true}"#).await;
    match result {
        Ok(body) => assert_eq!(body, r#"{"ok":true}"#),
        Err(err) => panic!("expected body, got: {err}"),
    }
}

#[test]
fn sanitize_redacts_pinecone_and_bearer_tokens() {
    let raw = "key pcsk_ABCDEFGHIJKLMNOPQRSTUV and Bearer abcdefghijklmnopqrstuvwxyz";
    let cleaned = sanitize_http_error_body(raw);
    assert!(!cleaned.contains("pcsk_ABCDEF"));
    assert!(!cleaned.contains("abcdefghijklmnopqrstuvwxyz"));
}

#[test]
fn sanitize_collapses_whitespace() {
    assert_eq!(sanitize_http_error_body("a \n\n  b\tc"), "a b c");
}

#[test]
fn client_errors_are_not_retryable() {
    let err = ProviderError::HttpStatus {
        status: 401,
        body: "unauthorized".to_owned(),
    };
    assert!(!err.is_retryable());
    let err = ProviderError::HttpStatus {
        status: 503,
        body: "unavailable".to_owned(),
    };
    assert!(err.is_retryable());
}
