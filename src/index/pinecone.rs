//! Pinecone REST data-plane client.
//!
//! Each Pinecone index has its own data-plane host. Hosts are resolved once
//! at startup via the control plane (`GET /indexes/{name}`) or supplied in
//! config, then held read-only for the life of the process.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{IndexError, Match, MetadataFilter, SimilarityIndex};
use crate::providers::sanitize_http_error_body;

/// Default Pinecone control-plane URL.
pub const DEFAULT_CONTROL_URL: &str = "https://api.pinecone.io";

/// Pinecone REST API version header value.
const API_VERSION: &str = "2024-07";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Body of `POST {host}/query`.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Query embedding.
    pub vector: Vec<f32>,
    /// Number of neighbours to return.
    pub top_k: usize,
    /// Return record metadata.
    pub include_metadata: bool,
    /// Return stored vectors.
    pub include_values: bool,
    /// Pinecone metadata filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

/// Response of `POST {host}/query`.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    /// Neighbours in descending score order.
    #[serde(default)]
    pub matches: Vec<QueryMatch>,
}

/// One neighbour in a query response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct QueryMatch {
    /// Record id.
    pub id: String,
    /// Similarity score.
    #[serde(default)]
    pub score: f32,
    /// Record metadata.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Response of `GET /indexes/{name}`.
#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

// ---------------------------------------------------------------------------
// Builders / parsers (pub for integration testing)
// ---------------------------------------------------------------------------

/// Translate a [`MetadataFilter`] into Pinecone's filter language.
#[doc(hidden)]
pub fn filter_expression(filter: &MetadataFilter) -> Option<Value> {
    filter
        .is_reply
        .map(|want| json!({ "is_reply": { "$eq": want } }))
}

/// Build the query body.
#[doc(hidden)]
pub fn build_query(vector: &[f32], top_k: usize, filter: &MetadataFilter) -> QueryRequest {
    QueryRequest {
        vector: vector.to_vec(),
        top_k,
        include_metadata: true,
        include_values: false,
        filter: filter_expression(filter),
    }
}

fn metadata_string(metadata: &Map<String, Value>, key: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn metadata_flag(metadata: &Map<String, Value>, key: &str) -> Option<bool> {
    match metadata.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Some(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Parse a query response into matches.
///
/// A record without an `is_reply` tag is taken to satisfy the requested
/// filter, since the server already applied it.
///
/// # Errors
///
/// Returns `IndexError::Parse` if the body is not a query response.
#[doc(hidden)]
pub fn parse_query_response(body: &str, filter: &MetadataFilter) -> Result<Vec<Match>, IndexError> {
    let resp: QueryResponse =
        serde_json::from_str(body).map_err(|e| IndexError::Parse(e.to_string()))?;

    let matches = resp
        .matches
        .into_iter()
        .map(|m| {
            let metadata = m.metadata.unwrap_or_default();
            let is_reply = metadata_flag(&metadata, "is_reply")
                .or(filter.is_reply)
                .unwrap_or(false);
            Match {
                id: m.id,
                similarity_score: m.score,
                subject: metadata_string(&metadata, "subject"),
                body: metadata_string(&metadata, "body"),
                source_tag: metadata_string(&metadata, "source"),
                is_reply,
            }
        })
        .collect();

    Ok(matches)
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Pinecone-backed [`SimilarityIndex`]. Collection names are index names.
pub struct PineconeIndex {
    api_key: String,
    control_url: String,
    hosts: HashMap<String, String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("control_url", &self.control_url)
            .field("hosts", &self.hosts)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl PineconeIndex {
    /// Create a client with no resolved hosts.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Request` if the HTTP client cannot be built.
    pub fn new(api_key: String, control_url: &str, timeout: Duration) -> Result<Self, IndexError> {
        Ok(Self {
            api_key,
            control_url: control_url.trim_end_matches('/').to_owned(),
            hosts: HashMap::new(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Register a known data-plane host for an index, skipping lookup.
    pub fn with_host(mut self, collection: &str, host: &str) -> Self {
        self.hosts
            .insert(collection.to_owned(), normalize_host(host));
        self
    }

    /// Data-plane host for a collection, if resolved.
    pub fn host(&self, collection: &str) -> Option<&str> {
        self.hosts.get(collection).map(String::as_str)
    }

    /// Look up data-plane hosts for every collection not yet registered.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure; a missing index surfaces as
    /// `IndexError::UnknownCollection`.
    pub async fn resolve_hosts<'a>(
        &mut self,
        collections: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), IndexError> {
        for collection in collections {
            if self.hosts.contains_key(collection) {
                continue;
            }
            let host = self.describe_host(collection).await?;
            info!(collection, host = %host, "resolved pinecone index host");
            self.hosts.insert(collection.to_owned(), host);
        }
        Ok(())
    }

    async fn describe_host(&self, collection: &str) -> Result<String, IndexError> {
        let url = format!("{}/indexes/{collection}", self.control_url);
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(IndexError::UnknownCollection(collection.to_owned()));
        }
        let body = check_response(response).await?;
        let described: DescribeIndexResponse =
            serde_json::from_str(&body).map_err(|e| IndexError::Parse(e.to_string()))?;
        Ok(normalize_host(&described.host))
    }
}

async fn check_response(response: reqwest::Response) -> Result<String, IndexError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(IndexError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

#[async_trait]
impl SimilarityIndex for PineconeIndex {
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Match>, IndexError> {
        let host = self
            .host(collection)
            .ok_or_else(|| IndexError::UnknownCollection(collection.to_owned()))?;

        let body = build_query(vector, top_k, filter);
        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let payload = check_response(response).await?;
        let matches = parse_query_response(&payload, filter)?;
        debug!(collection, returned = matches.len(), "pinecone query complete");
        Ok(matches)
    }
}
