//! Configuration loading and management.
//!
//! Loads mailvoice configuration from `./mailvoice.toml` (or
//! `$MAILVOICE_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.
//!
//! Precedence: env vars > config file > defaults.
//!
//! Secrets never live here; see [`crate::credentials`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::credentials::{Credentials, OPENAI_API_KEY, PINECONE_API_KEY};
use crate::drafting::DraftSettings;
use crate::embedding::EmbedderSettings;
use crate::index::pinecone::DEFAULT_CONTROL_URL;
use crate::persona::{PersonaError, PersonaOverride, PersonaRegistry};
use crate::providers::retry::RetryPolicy;
use crate::providers::{parse_provider_string, ProviderSettings};

/// Env var naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "MAILVOICE_CONFIG_PATH";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mailvoice.toml";

const SUPPORTED_PROVIDERS: [&str; 2] = ["openai", "ollama"];

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings (`[server]`).
    pub server: ServerConfig,
    /// Retrieval and ranking (`[retrieval]`).
    pub retrieval: RetrievalConfig,
    /// Embedding model (`[embedding]`).
    pub embedding: EmbeddingConfig,
    /// Generative model (`[generation]`).
    pub generation: GenerationConfig,
    /// Similarity index (`[index]`).
    pub index: IndexConfig,
    /// Persona patches and additions (`[personas.<id>]`).
    pub personas: BTreeMap<String, PersonaOverride>,
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `path` wins over `$MAILVOICE_CONFIG_PATH`, which wins over
    /// `./mailvoice.toml`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Self::load`] with a custom env resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::resolve_path(path, &env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// The file [`Self::load_with`] reads: `path` if given, else the env
    /// resolution of [`Self::config_path_with`].
    pub fn resolve_path(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path_with(env),
        }
    }

    /// Resolve the config path using a custom env resolver.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        match env(CONFIG_PATH_VAR) {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests need not mutate the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("PORT") {
            match v.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(var = "PORT", value = %v, "ignoring invalid env override"),
            }
        }
        if let Some(v) = env("MAILVOICE_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("MAILVOICE_LOG_DIR") {
            self.server.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("MAILVOICE_GENERATION_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = env("MAILVOICE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = env("MAILVOICE_INDEX_CONTROL_URL") {
            self.index.control_url = v;
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed TOML or mistyped fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error for the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be at least 1");
        }
        if r.max_examples == 0 {
            anyhow::bail!("retrieval.max_examples must be at least 1");
        }
        if !(-1.0..=1.0).contains(&r.min_score) {
            anyhow::bail!("retrieval.min_score {} outside [-1, 1]", r.min_score);
        }
        if self.embedding.dimensions == 0 {
            anyhow::bail!("embedding.dimensions must be positive");
        }
        if self.generation.max_attempts == 0 {
            anyhow::bail!("generation.max_attempts must be at least 1");
        }
        for (field, spec) in [
            ("embedding.model", &self.embedding.model),
            ("generation.model", &self.generation.model),
        ] {
            let (provider, _) =
                parse_provider_string(spec).with_context(|| format!("invalid {field}"))?;
            if !SUPPORTED_PROVIDERS.contains(&provider) {
                anyhow::bail!("{field}: unsupported provider '{provider}'");
            }
        }
        self.persona_registry()?;
        Ok(())
    }

    /// Built-in personas patched by `[personas.*]`.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError`] for an invalid or incomplete persona.
    pub fn persona_registry(&self) -> Result<PersonaRegistry, PersonaError> {
        PersonaRegistry::from_overrides(&self.personas)
    }

    /// Credential names this configuration needs.
    pub fn required_credentials(&self) -> Vec<&'static str> {
        let mut keys = vec![PINECONE_API_KEY];
        let uses_openai = [&self.embedding.model, &self.generation.model]
            .iter()
            .any(|spec| spec.starts_with("openai/"));
        if uses_openai {
            keys.push(OPENAI_API_KEY);
        }
        keys
    }

    /// Fail unless every required credential is present.
    ///
    /// # Errors
    ///
    /// Lists every missing credential.
    pub fn check_credentials(&self, credentials: &Credentials) -> Result<()> {
        let missing: Vec<&str> = self
            .required_credentials()
            .into_iter()
            .filter(|key| credentials.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("missing required credentials: {}", missing.join(", "));
        }
        Ok(())
    }

    /// Retry policy for generation.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.generation.max_attempts,
            initial_backoff_ms: self.generation.initial_backoff_ms,
            max_backoff_ms: self.generation.max_backoff_ms,
        }
    }

    /// Embedder connection settings.
    pub fn embedder_settings(&self) -> EmbedderSettings {
        EmbedderSettings {
            dimensions: self.embedding.dimensions,
            base_url: self.embedding.base_url.clone(),
            timeout: Duration::from_secs(self.embedding.timeout_secs),
        }
    }

    /// Generation provider connection settings (per attempt).
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.generation.base_url.clone(),
            timeout: Duration::from_secs(self.generation.timeout_secs),
        }
    }

    /// Pipeline settings and stage deadlines.
    ///
    /// The generation deadline covers every attempt plus the capped backoff
    /// between them.
    pub fn draft_settings(&self) -> DraftSettings {
        let g = &self.generation;
        let attempts = u64::from(g.max_attempts.max(1));
        let generation_ms = g
            .timeout_secs
            .saturating_mul(1_000)
            .saturating_mul(attempts)
            .saturating_add(g.max_backoff_ms.saturating_mul(attempts.saturating_sub(1)));
        DraftSettings {
            top_k: self.retrieval.top_k,
            min_score: self.retrieval.min_score,
            max_examples: self.retrieval.max_examples,
            excerpt_chars: self.retrieval.excerpt_chars,
            embed_timeout: Duration::from_secs(self.embedding.timeout_secs),
            query_timeout: Duration::from_secs(self.retrieval.query_timeout_secs),
            generation_timeout: Duration::from_millis(generation_ms),
        }
    }
}

// ── Server config ───────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory for rolling JSON logs; stdout only when unset.
    pub log_dir: Option<PathBuf>,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            log_dir: None,
            max_body_bytes: 65_536,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Retrieval config ────────────────────────────────────────────

/// Retrieval and ranking settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested per query.
    pub top_k: usize,
    /// Exclusive similarity threshold.
    pub min_score: f32,
    /// Exemplars placed in the prompt.
    pub max_examples: usize,
    /// Body characters kept per exemplar.
    pub excerpt_chars: usize,
    /// Index query deadline in seconds.
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.6,
            max_examples: 3,
            excerpt_chars: 300,
            query_timeout_secs: 10,
        }
    }
}

// ── Model configs ───────────────────────────────────────────────

/// Embedding model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `provider/model`; must be the model that populated the index.
    pub model: String,
    /// Vector dimensionality of the index.
    pub dimensions: usize,
    /// Override for the provider base URL.
    pub base_url: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

/// all-MiniLM-L6-v2 served by Ollama, the model the persona collections
/// were indexed with.
pub const DEFAULT_EMBEDDING_MODEL: &str = "ollama/all-minilm";

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            dimensions: 384,
            base_url: None,
            timeout_secs: 10,
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// `provider/model`.
    pub model: String,
    /// Override for the provider base URL.
    pub base_url: Option<String>,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// First retry delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Retry delay cap in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            model: "openai/gpt-4".to_owned(),
            base_url: None,
            timeout_secs: 60,
            max_attempts: retry.max_attempts,
            initial_backoff_ms: retry.initial_backoff_ms,
            max_backoff_ms: retry.max_backoff_ms,
        }
    }
}

// ── Index config ────────────────────────────────────────────────

/// Similarity index settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Pinecone control-plane URL used to resolve index hosts.
    pub control_url: String,
    /// Known data-plane hosts by collection; others are resolved at startup.
    pub hosts: BTreeMap<String, String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            control_url: DEFAULT_CONTROL_URL.to_owned(),
            hosts: BTreeMap::new(),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────
