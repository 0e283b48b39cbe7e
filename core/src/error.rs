//! Structured error types for gemchat
//!
//! The generation client and startup code report failures through
//! [`GemchatError`]; the session loop turns them into a single console line.

use thiserror::Error;

/// Primary error type for gemchat operations
#[derive(Error, Debug)]
pub enum GemchatError {
    // =========================================================================
    // Credential / Configuration Errors
    // =========================================================================
    /// Required credential variable is not set
    #[error("{var} not set")]
    MissingCredential { var: String },

    /// Credential is present but cannot be sent
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    // =========================================================================
    // Provider / API Errors
    // =========================================================================
    /// Authentication/authorization rejected by the API (401/403)
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit or quota exceeded (429)
    #[error("rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    /// Provider returned a non-success status
    #[error("provider error: {status} - {message}")]
    ProviderError { status: u16, message: String },

    /// Response body could not be read or decoded
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    // =========================================================================
    // Network / System Errors
    // =========================================================================
    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GemchatError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential { var } => format!(
                "{var} not set. Put {var}=your_key in a .env file or export it."
            ),
            Self::Unauthorized { message } => {
                format!("Authentication failed ({message}). Please check your API key.")
            }
            Self::RateLimitExceeded { message } => {
                format!("Rate limit or quota exceeded ({message}). Please try again later.")
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias using GemchatError
pub type Result<T> = std::result::Result<T, GemchatError>;

/// Extension trait for converting Option to Result with GemchatError
pub trait OptionExt<T> {
    fn ok_or_missing(self, var: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing(self, var: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| GemchatError::MissingCredential { var: var.into() })
    }
}
