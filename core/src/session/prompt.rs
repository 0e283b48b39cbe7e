//! Prompt assembly
//!
//! The model sees one flat text: the current time, the remembered
//! exchanges as `User:`/`AI:` blocks, then the new input.

use crate::memory::Exchange;
use chrono::{Local, SecondsFormat};

/// Local time with offset, e.g. `2026-10-16T14:03:27+02:00`
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Build the prompt text; blocks are separated by one blank line.
pub fn build_prompt(timestamp: &str, history: &[Exchange], input: &str) -> String {
    let mut blocks = Vec::with_capacity(history.len() + 2);
    blocks.push(format!("Current date and time: {}", timestamp));
    blocks.extend(
        history
            .iter()
            .map(|exchange| format!("User: {}\nAI: {}", exchange.user, exchange.ai)),
    );
    blocks.push(format!("User: {}", input));
    blocks.join("\n\n")
}
