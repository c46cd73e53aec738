//! Embedder construction from `provider/model` strings.

use std::collections::BTreeMap;
use std::time::Duration;

use mailvoice::credentials::{Credentials, OPENAI_API_KEY};
use mailvoice::embedding::{from_spec, EmbedderSettings};

fn settings() -> EmbedderSettings {
    EmbedderSettings {
        dimensions: 384,
        base_url: None,
        timeout: Duration::from_secs(5),
    }
}

#[test]
fn openai_embedder_needs_key() {
    assert!(from_spec("openai/text-embedding-3-small", &settings(), &Credentials::default()).is_err());

    let mut vars = BTreeMap::new();
    vars.insert(OPENAI_API_KEY.to_owned(), "sk-test".to_owned());
    match from_spec(
        "openai/text-embedding-3-small",
        &settings(),
        &Credentials::from_map(vars),
    ) {
        Ok(embedder) => assert_eq!(embedder.dimensions(), 384),
        Err(err) => panic!("should build: {err}"),
    }
}

#[test]
fn ollama_embedder_builds_without_key() {
    match from_spec("ollama/nomic-embed-text", &settings(), &Credentials::default()) {
        Ok(embedder) => assert_eq!(embedder.dimensions(), 384),
        Err(err) => panic!("should build: {err}"),
    }
}

#[test]
fn unknown_embedding_provider_is_rejected() {
    assert!(from_spec("cohere/embed-v3", &settings(), &Credentials::default()).is_err());
}
