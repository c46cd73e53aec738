//! Provider API keys from the process environment and an optional `.env`.
//!
//! Process environment wins over the `.env` file. Keys are never printed:
//! [`Credentials`] redacts values in its `Debug` output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

/// Environment variable holding the Pinecone API key.
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Every credential key the service knows about.
pub const KNOWN_KEYS: &[&str] = &[OPENAI_API_KEY, PINECONE_API_KEY];

/// Runtime credentials.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns a required credential or an error when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is absent or blank.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("missing required credential: {key}"))
    }

    /// Merge known keys from an env resolver over the current values.
    fn overlay(&mut self, env: impl Fn(&str) -> Option<String>) {
        for key in KNOWN_KEYS {
            if let Some(value) = env(key) {
                self.vars.insert((*key).to_owned(), value);
            }
        }
    }
}

/// Load credentials from an optional `.env` file, then the process env.
///
/// A missing `.env` is not an error.
///
/// # Errors
///
/// Returns an error if the `.env` file exists but cannot be parsed.
pub fn load_credentials(env_file: &Path) -> anyhow::Result<Credentials> {
    load_credentials_with(env_file, |key| std::env::var(key).ok())
}

/// Load credentials using a custom env resolver (for testing).
///
/// # Errors
///
/// Returns an error if the `.env` file exists but cannot be parsed.
pub fn load_credentials_with(
    env_file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Credentials> {
    let mut credentials = if env_file.exists() {
        read_env_file(env_file)?
    } else {
        debug!(path = %env_file.display(), "no .env file, using process environment only");
        Credentials::default()
    };
    credentials.overlay(env);
    Ok(credentials)
}

fn read_env_file(path: &Path) -> anyhow::Result<Credentials> {
    warn_on_broad_permissions(path);

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        if KNOWN_KEYS.contains(&key.as_str()) {
            vars.insert(key, value);
        }
    }

    Ok(Credentials { vars })
}

#[cfg(unix)]
fn warn_on_broad_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{mode:o}"),
                "credentials file is readable by other users, expected 0600"
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_on_broad_permissions(_path: &Path) {}
