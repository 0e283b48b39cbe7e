//! LLM client module
//!
//! A single non-streaming text generation call against the Google
//! Generative AI (Gemini) REST API, behind the [`TextGenerator`] trait so the
//! session loop can run against any backend.

pub mod client;

pub use client::{GeminiClient, GenerateContentResponse};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Turns a prompt into reply text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logs and banners
    fn model(&self) -> &str;

    /// Generate a reply for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// LLM Configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API endpoint base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// API key
    pub api_key: String,
    /// Request timeout; none waits for as long as the server takes
    pub timeout: Option<Duration>,
}

impl LlmConfig {
    /// Create a new LLM config
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        LlmConfig {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Build from the loaded [`Config`] and a resolved key
    pub fn from_config(config: &Config, api_key: impl Into<String>) -> Self {
        Self::new(config.base_url.clone(), config.model.clone(), api_key).with_timeout(config.timeout())
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
