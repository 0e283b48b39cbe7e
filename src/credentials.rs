use gemchat_core::config::API_KEY_VAR;
use gemchat_core::error::{GemchatError, OptionExt, Result};
use std::path::Path;

/// Populate the environment from a `.env` file, then read the API key.
///
/// Without `env_file`, a `.env` in the current directory (or a parent) is
/// used when present. Variables already set in the environment win.
pub fn load_api_key(env_file: Option<&Path>) -> Result<String> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| GemchatError::InvalidConfig {
                message: format!("failed to read env file {}: {}", path.display(), e),
            })?;
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!("Loaded environment from {}", path.display());
            }
        }
    }

    resolve_api_key(|var| std::env::var(var).ok())
}

/// Look up the key through `lookup`, treating blank values as missing.
pub fn resolve_api_key(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    lookup(API_KEY_VAR)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_missing(API_KEY_VAR)
}
