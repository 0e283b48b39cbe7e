//! Configuration management
//!
//! Optional `gemchat.toml` settings, searched in the working directory and
//! then the user config directory. Every key has a default, so running
//! without a file is the common case.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name looked up in the standard locations
pub const CONFIG_FILE_NAME: &str = "gemchat.toml";

/// Environment variable holding the Gemini API key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// What the session does after a failed generation call
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Print the diagnostic and end the session
    #[default]
    Exit,
    /// Print the diagnostic and prompt again
    Continue,
}

impl std::fmt::Display for OnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnError::Exit => write!(f, "exit"),
            OnError::Continue => write!(f, "continue"),
        }
    }
}

/// Unified gemchat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier sent to the API
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Conversation memory file (defaults to the data directory)
    pub memory_file: Option<PathBuf>,
    /// Request timeout; none means wait indefinitely
    pub timeout_secs: Option<u64>,
    /// Error policy for failed generation calls
    pub on_error: OnError,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            memory_file: None,
            timeout_secs: None,
            on_error: OnError::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load from the first standard location, or defaults.
    ///
    /// A discovered file that fails to parse is logged and ignored.
    pub fn load_or_default() -> Self {
        let Some(path) = find_config_file() else {
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolved memory file path
    pub fn memory_path(&self) -> PathBuf {
        self.memory_file.clone().unwrap_or_else(default_memory_path)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Find the configuration file in standard locations
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(dir) = get_config_dir() {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Get the configuration directory path
pub fn get_config_dir() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Some(dir.join("gemchat"));
    }

    home::home_dir().map(|home| home.join(".config").join("gemchat"))
}

/// Get the data directory used for memory and logs
pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("gemchat"))
}

/// Default memory file: `<data_dir>/gemchat/memory.json`, or `./memory.json`
pub fn default_memory_path() -> PathBuf {
    get_data_dir()
        .map(|dir| dir.join("memory.json"))
        .unwrap_or_else(|| PathBuf::from("memory.json"))
}
