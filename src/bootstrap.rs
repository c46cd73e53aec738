//! Startup wiring: config and credentials in, a ready [`Drafter`] out.
//!
//! Everything that can be checked before serving is checked here, so a bad
//! deployment fails at startup rather than on the first request.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::credentials::{Credentials, PINECONE_API_KEY};
use crate::drafting::Drafter;
use crate::embedding;
use crate::index::pinecone::PineconeIndex;
use crate::providers::{self, retry::RetryingProvider};

/// Validate `config`, check credentials and build the production pipeline.
///
/// Resolves the Pinecone data-plane host of every persona collection.
///
/// # Errors
///
/// Returns an error for invalid config, a missing credential, an unknown
/// provider, or a collection the index does not have.
pub async fn build_drafter(config: &Config, credentials: &Credentials) -> anyhow::Result<Drafter> {
    config.validate()?;
    config.check_credentials(credentials)?;
    let personas = config.persona_registry()?;

    let embedder = embedding::from_spec(
        &config.embedding.model,
        &config.embedder_settings(),
        credentials,
    )
    .context("failed to create embedder")?;

    let provider = providers::from_spec(
        &config.generation.model,
        &config.provider_settings(),
        credentials,
    )
    .context("failed to create generation provider")?;
    let provider = Arc::new(RetryingProvider::new(provider, config.retry_policy()));

    let settings = config.draft_settings();
    let mut index = PineconeIndex::new(
        credentials.require(PINECONE_API_KEY)?,
        &config.index.control_url,
        settings.query_timeout,
    )?;
    for (collection, host) in &config.index.hosts {
        index = index.with_host(collection, host);
    }
    index
        .resolve_hosts(personas.collections())
        .await
        .context("failed to resolve similarity index hosts")?;

    info!(
        personas = ?personas.ids(),
        embedding = %config.embedding.model,
        generation = %config.generation.model,
        "drafting pipeline ready"
    );

    Ok(Drafter::new(
        embedder,
        Arc::new(index),
        provider,
        personas,
        settings,
    ))
}
