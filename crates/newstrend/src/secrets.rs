//! Analyzer credential resolution.
//!
//! The analyzer API key can be supplied three ways, checked in order:
//!
//! 1. **Direct value** in the config file (`api_key`), for local testing
//! 2. **File reference** (`api_key_file`), for mounted container secrets
//! 3. **Env var reference** (`api_key_env_var`), for production deployments

use secrecy::SecretString;

use crate::config::ApiKeySource;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from {origin} is empty")]
    Empty { origin: &'static str },
}

pub type Result<T> = std::result::Result<T, SecretError>;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves the configured API key. Returns `Ok(None)` when no source is
/// configured; a configured source that cannot be read is an error.
pub fn resolve_api_key(source: &ApiKeySource) -> Result<Option<SecretString>> {
    if let Some(value) = non_empty(source.api_key.as_deref()) {
        return Ok(Some(SecretString::from(value.trim().to_string())));
    }

    if let Some(path) = non_empty(source.api_key_file.as_deref()) {
        let expanded = expand_home(path);
        let content = std::fs::read_to_string(&expanded).map_err(|e| SecretError::FileRead {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::Empty { origin: "file" });
        }
        return Ok(Some(SecretString::from(trimmed.to_string())));
    }

    if let Some(name) = non_empty(source.api_key_env_var.as_deref()) {
        return match std::env::var(name) {
            // Env vars mounted from files often carry a trailing newline.
            Ok(value) if value.trim().is_empty() => Err(SecretError::Empty { origin: "env var" }),
            Ok(value) => Ok(Some(SecretString::from(value.trim().to_string()))),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Ok(None)
}

/// Expands a leading `~` to the home directory. `~user` is not supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
