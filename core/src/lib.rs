pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod output;
pub mod session;
pub mod util;

// Re-exports for convenience
pub use config::Config;
pub use error::{GemchatError, Result};
pub use llm::{GeminiClient, LlmConfig, TextGenerator};
pub use memory::{Exchange, ExchangeStore, MAX_MEMORY};
pub use session::{Session, SessionEnd};
