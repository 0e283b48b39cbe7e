//! Bounded exchange store
//!
//! Keeps the most recent [`MAX_MEMORY`] exchanges in memory and mirrors them
//! to a pretty-printed JSON file after every change. Storage failures never
//! reach the console: a broken file loads as an empty memory and a failed
//! write is logged and otherwise ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of exchanges retained
pub const MAX_MEMORY: usize = 10;

/// One user turn and the model's reply to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub ai: String,
}

impl Exchange {
    pub fn new(user: impl Into<String>, ai: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ai: ai.into(),
        }
    }
}

/// Ordered, capped sequence of exchanges backed by a JSON file
#[derive(Debug)]
pub struct ExchangeStore {
    path: PathBuf,
    exchanges: Vec<Exchange>,
}

impl ExchangeStore {
    /// Open the store at `path`, loading whatever it already holds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut exchanges = load(&path);
        trim_to_cap(&mut exchanges);
        tracing::debug!(
            "Opened memory at {} with {} exchange(s)",
            path.display(),
            exchanges.len()
        );
        Self { path, exchanges }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Up to the last [`MAX_MEMORY`] exchanges, oldest first.
    pub fn recent(&self) -> &[Exchange] {
        let start = self.exchanges.len().saturating_sub(MAX_MEMORY);
        &self.exchanges[start..]
    }

    /// Append an exchange, drop the oldest beyond the cap and persist.
    pub fn record(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
        trim_to_cap(&mut self.exchanges);
        self.save();
    }

    /// Forget everything and persist the empty sequence.
    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.save();
        tracing::info!("Memory cleared at {}", self.path.display());
    }

    /// Write the current sequence, logging instead of failing.
    pub fn save(&self) {
        if let Err(e) = save(&self.path, &self.exchanges) {
            tracing::warn!("Failed to save memory: {:#}", e);
        }
    }
}

fn trim_to_cap(exchanges: &mut Vec<Exchange>) {
    if exchanges.len() > MAX_MEMORY {
        let excess = exchanges.len() - MAX_MEMORY;
        exchanges.drain(..excess);
    }
}

/// Read the exchanges stored at `path`.
///
/// A missing file is an empty memory. So is an unreadable or corrupt one,
/// with a warning in the log.
pub fn load(path: &Path) -> Vec<Exchange> {
    if !path.exists() {
        return Vec::new();
    }

    match try_load(path) {
        Ok(exchanges) => exchanges,
        Err(e) => {
            tracing::warn!("Discarding unreadable memory file: {:#}", e);
            Vec::new()
        }
    }
}

fn try_load(path: &Path) -> Result<Vec<Exchange>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read memory file: {:?}", path))?;

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse memory file: {:?}", path))
}

/// Overwrite `path` with the full sequence as pretty JSON.
pub fn save(path: &Path, exchanges: &[Exchange]) -> Result<()> {
    let content =
        serde_json::to_string_pretty(exchanges).context("Failed to serialize memory")?;

    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write memory file: {:?}", path))
}

fn atomic_write(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent dir: {:?}", parent))?;

    let tmp = dest.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write temp file: {:?}", tmp))?;

    if let Err(rename_err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(rename_err).context("Failed to rename temp file into place");
    }

    Ok(())
}
