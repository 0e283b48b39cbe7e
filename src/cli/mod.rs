//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat with Gemini from the terminal
///
/// Keeps the last few exchanges on disk so the model has context across
/// turns and sessions. Type `show memory`, `forget` or `exit` at the prompt.
#[derive(Parser, Debug)]
#[command(name = "gemchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute (defaults to an interactive chat)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Conversation memory file (overrides config)
    #[arg(long, global = true)]
    pub memory_file: Option<PathBuf>,

    /// Read GEMINI_API_KEY from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Config file to use instead of the standard locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep chatting after a failed API call instead of exiting
    #[arg(short, long, global = true)]
    pub keep_going: bool,

    /// Write logs to stderr instead of the log file
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start an interactive chat (the default)
    Chat,

    /// Ask a single question with remembered context, then exit
    Ask {
        /// The question for the model
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Inspect or clear the conversation memory
    Memory {
        #[command(subcommand)]
        cmd: MemoryCommand,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum MemoryCommand {
    /// Print remembered exchanges
    Show,
    /// Clear remembered exchanges
    Forget,
}
