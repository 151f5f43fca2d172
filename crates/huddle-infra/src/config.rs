//! Provider configuration loader.
//!
//! Reads `config.toml` from the Huddle home directory (`~/.huddle/` by
//! default) and then applies environment variable overrides. A missing
//! file means defaults; a malformed file or an invalid override value is a
//! configuration error, since a misconfigured store must not start.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use huddle_types::config::{EmbeddingKind, ProviderConfig, ProviderKind};
use huddle_types::error::MemoryError;

/// Environment lookup used for overrides and credentials, injectable for tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Look up a process environment variable, treating empty values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the Huddle home directory.
///
/// Priority:
/// 1. `HUDDLE_HOME` environment variable
/// 2. `~/.huddle`
/// 3. `./.huddle` when no home directory is known
pub fn resolve_home_dir() -> PathBuf {
    if let Some(dir) = process_env("HUDDLE_HOME") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".huddle");
    }
    PathBuf::from(".huddle")
}

/// Read a configuration file. A missing file yields the defaults.
pub async fn load_config_file(path: &Path) -> Result<ProviderConfig, MemoryError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(ProviderConfig::default());
        }
        Err(err) => {
            return Err(MemoryError::Config(format!(
                "failed to read {}: {err}",
                path.display()
            )));
        }
    };

    toml::from_str::<ProviderConfig>(&content)
        .map_err(|err| MemoryError::Config(format!("failed to parse {}: {err}", path.display())))
}

fn parse_env<T>(lookup: EnvLookup<'_>, key: &str) -> Result<Option<T>, MemoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| MemoryError::Config(format!("invalid {key} '{raw}': {e}"))),
    }
}

/// Apply environment overrides on top of `config`.
///
/// Only variables that are set (and non-empty) change a field.
pub fn apply_env_overrides(config: &mut ProviderConfig, lookup: EnvLookup<'_>) -> Result<(), MemoryError> {
    if let Some(kind) = parse_env::<ProviderKind>(lookup, "MEMORY_PROVIDER")? {
        config.provider = kind;
    }
    if let Some(kind) = parse_env::<EmbeddingKind>(lookup, "EMBEDDING_PROVIDER")? {
        config.embedding = kind;
    }
    if let Some(kind) = parse_env::<ProviderKind>(lookup, "PRIMARY_PROVIDER")? {
        config.primary_provider = kind;
    }
    if let Some(kind) = parse_env::<ProviderKind>(lookup, "SECONDARY_PROVIDER")? {
        config.secondary_provider = kind;
    }

    let strings: [(&str, &mut String); 7] = [
        ("VECTOR_BUCKET", &mut config.bucket),
        ("VECTOR_INDEX", &mut config.index_name),
        ("AWS_REGION", &mut config.region),
        ("RUVECTOR_ENDPOINT", &mut config.endpoint),
        ("RUVECTOR_COLLECTION", &mut config.collection),
        ("RUVECTOR_MODEL", &mut config.ruvector_model),
        ("EMBEDDING_MODEL_ID", &mut config.embedding_model),
    ];
    for (key, field) in strings {
        if let Some(value) = lookup(key) {
            *field = value.trim().to_string();
        }
    }

    if let Some(size) = parse_env::<usize>(lookup, "VECTOR_MAX_BATCH_SIZE")? {
        config.max_batch_size = size;
    }
    if let Some(dims) = parse_env::<usize>(lookup, "EMBEDDING_DIMENSIONS")? {
        config.embedding_dimensions = dims;
    }
    if let Some(dims) = parse_env::<usize>(lookup, "RUVECTOR_DIMENSIONS")? {
        config.ruvector_dimensions = dims;
    }
    Ok(())
}

/// Load the effective configuration: file (if any), then environment
/// overrides, then validation.
///
/// `path` defaults to `{home}/config.toml`.
pub async fn load_provider_config_with(
    path: Option<&Path>,
    lookup: EnvLookup<'_>,
) -> Result<ProviderConfig, MemoryError> {
    let default_path;
    let path = match path {
        Some(path) => path,
        None => {
            default_path = resolve_home_dir().join(CONFIG_FILE_NAME);
            default_path.as_path()
        }
    };

    let mut config = load_config_file(path).await?;
    apply_env_overrides(&mut config, lookup)?;
    config.validate()?;
    tracing::debug!(
        provider = %config.provider,
        embedding = %config.embedding,
        "Loaded vector store configuration"
    );
    Ok(config)
}

/// [`load_provider_config_with`] using the process environment.
pub async fn load_provider_config(path: Option<&Path>) -> Result<ProviderConfig, MemoryError> {
    load_provider_config_with(path, &process_env).await
}
