//! `gemchat` - a terminal chat client for Gemini
//!
//! Reads GEMINI_API_KEY, forwards each line (with the last few remembered
//! exchanges) to the model and prints the reply.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;

use crate::cli::{Cli, Commands, MemoryCommand};
use gemchat_core::config::{Config, OnError};
use gemchat_core::llm::{GeminiClient, LlmConfig, TextGenerator};
use gemchat_core::memory::ExchangeStore;
use gemchat_core::output::OutputFormatter;
use gemchat_core::session::{Session, SessionEnd};
use gemchat_core::GemchatError;

mod cli;
mod credentials;
mod logging;

/// Main entry point for the chat CLI
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match run(cli).await {
        Ok(SessionEnd::Exited) => ExitCode::SUCCESS,
        Ok(SessionEnd::Aborted) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            match e.downcast_ref::<GemchatError>() {
                Some(err) => eprintln!("Error: {}", err.user_message()),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<SessionEnd> {
    let config = resolve_config(&cli)?;
    let formatter = OutputFormatter::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let end = match &cli.command {
        None | Some(Commands::Chat) => {
            let mut session = open_session(&cli, &config)?;
            session.run(std::io::stdin().lock(), &mut out).await?
        }

        Some(Commands::Ask { query }) => {
            let query = one_shot_query(query)?;
            let mut session = open_session(&cli, &config)?;
            ask_once(&mut session, &query, &formatter, &mut out).await?
        }

        Some(Commands::Memory { cmd }) => {
            let mut store = ExchangeStore::open(config.memory_path());
            memory_command(cmd, &mut store, &formatter, &mut out)?;
            SessionEnd::Exited
        }
    };

    out.flush()?;
    Ok(end)
}

/// Join the `ask` words into one trimmed query; blank input is refused.
fn one_shot_query(words: &[String]) -> Result<String> {
    let query = words.join(" ");
    let query = query.trim();
    if query.is_empty() {
        bail!("Nothing to ask: the query is empty");
    }
    Ok(query.to_string())
}

/// Run a single turn. A failed generation call is reported on `out` and
/// ends as [`SessionEnd::Aborted`]; console write failures are errors.
async fn ask_once<G: TextGenerator, W: Write>(
    session: &mut Session<G>,
    query: &str,
    formatter: &OutputFormatter,
    out: &mut W,
) -> Result<SessionEnd> {
    match session.ask(query, out).await {
        Ok(_) => Ok(SessionEnd::Exited),
        Err(GemchatError::Io(e)) => Err(e).context("Failed to write output"),
        Err(e) => {
            formatter.print_api_error(out, e.user_message())?;
            Ok(SessionEnd::Aborted)
        }
    }
}

fn memory_command<W: Write>(
    cmd: &MemoryCommand,
    store: &mut ExchangeStore,
    formatter: &OutputFormatter,
    out: &mut W,
) -> Result<()> {
    match cmd {
        MemoryCommand::Show => formatter.print_memory(out, store.recent())?,
        MemoryCommand::Forget => {
            store.clear();
            formatter.print_forgotten(out)?;
        }
    }
    Ok(())
}

/// Config file (explicit or discovered) with CLI overrides applied
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    };

    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(memory_file) = &cli.memory_file {
        config.memory_file = Some(memory_file.clone());
    }
    if cli.keep_going {
        config.on_error = OnError::Continue;
    }

    Ok(config)
}

/// Resolve the credential and wire the client and memory into a session
fn open_session(cli: &Cli, config: &Config) -> Result<Session<GeminiClient>> {
    let api_key = credentials::load_api_key(cli.env_file.as_deref())?;
    let client = GeminiClient::new(LlmConfig::from_config(config, api_key))
        .context("Failed to create Gemini client")?;
    let store = ExchangeStore::open(config.memory_path());

    Ok(Session::new(client, store).with_error_policy(config.on_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gemchat_core::memory::{store, Exchange};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers `pong`, or fails with a provider error when `fail` is set
    #[derive(Default)]
    struct PingGenerator {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for PingGenerator {
        fn model(&self) -> &str {
            "ping"
        }

        async fn generate(&self, _prompt: &str) -> gemchat_core::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GemchatError::ProviderError {
                    status: 503,
                    message: "overloaded".to_string(),
                })
            } else {
                Ok("pong".to_string())
            }
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session_at(path: &Path, generator: PingGenerator) -> Session<PingGenerator> {
        Session::new(generator, ExchangeStore::open(path)).with_formatter(OutputFormatter::plain())
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_ask_is_refused() {
        assert!(one_shot_query(&words(&["   "])).is_err());
        assert!(one_shot_query(&words(&["", " \t"])).is_err());
        assert_eq!(one_shot_query(&words(&[" hi "])).unwrap(), "hi");
        assert_eq!(
            one_shot_query(&words(&["what", "time", "is it? "])).unwrap(),
            "what time is it?"
        );
    }

    #[tokio::test]
    async fn blank_ask_fails_before_reading_credentials() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let cli = Cli::try_parse_from([
            "gemchat".into(),
            "--memory-file".into(),
            path.clone().into_os_string(),
            "--env-file".into(),
            dir.path().join("missing.env").into_os_string(),
            "ask".into(),
            "   ".into(),
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("Nothing to ask"), "{err:#}");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn ask_prints_reply_and_records_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let mut session = session_at(&path, PingGenerator::default());
        let mut out = Vec::new();

        let end = ask_once(&mut session, "ping", &OutputFormatter::plain(), &mut out)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Exited);
        assert_eq!(String::from_utf8(out).unwrap(), "AI: pong\n");
        assert_eq!(store::load(&path), vec![Exchange::new("ping", "pong")]);
    }

    #[tokio::test]
    async fn failed_ask_reports_and_aborts() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let generator = PingGenerator {
            fail: true,
            ..Default::default()
        };
        let mut session = session_at(&path, generator);
        let mut out = Vec::new();

        let end = ask_once(&mut session, "ping", &OutputFormatter::plain(), &mut out)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Aborted);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "API call failed: provider error: 503 - overloaded\n"
        );
        assert_eq!(session.generator().calls.load(Ordering::SeqCst), 1);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn ask_output_failure_is_not_an_api_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = session_at(&dir.path().join("memory.json"), PingGenerator::default());

        let err = ask_once(&mut session, "ping", &OutputFormatter::plain(), &mut BrokenPipe)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to write output"), "{err:#}");
    }

    #[test]
    fn memory_show_lists_or_reports_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        let formatter = OutputFormatter::plain();

        let mut out = Vec::new();
        let mut store = ExchangeStore::open(&path);
        memory_command(&MemoryCommand::Show, &mut store, &formatter, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "(memory is empty)\n");

        store::save(&path, &[Exchange::new("hello", "hi!"), Exchange::new("bye", "ciao")]).unwrap();
        let mut out = Vec::new();
        let mut store = ExchangeStore::open(&path);
        memory_command(&MemoryCommand::Show, &mut store, &formatter, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1. user: hello\n   ai: hi!\n2. user: bye\n   ai: ciao\n"
        );
    }

    #[tokio::test]
    async fn memory_forget_needs_no_credential() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memory.json");
        store::save(&path, &[Exchange::new("hello", "hi!")]).unwrap();

        let cli = Cli::try_parse_from([
            "gemchat".into(),
            "--memory-file".into(),
            path.clone().into_os_string(),
            "--env-file".into(),
            dir.path().join("missing.env").into_os_string(),
            "memory".into(),
            "forget".into(),
        ])
        .unwrap();

        assert_eq!(run(cli).await.unwrap(), SessionEnd::Exited);
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gemchat.toml");
        std::fs::write(&path, "model = \"from-file\"\ntimeout_secs = 5\n").unwrap();

        let cli = Cli::try_parse_from([
            "gemchat".into(),
            "--config".into(),
            path.clone().into_os_string(),
            "--model".into(),
            "from-flag".into(),
            "--memory-file".into(),
            "chat.json".into(),
            "--keep-going".into(),
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.model, "from-flag");
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.memory_path(), PathBuf::from("chat.json"));
        assert_eq!(config.on_error, OnError::Continue);
    }

    #[test]
    fn explicit_config_must_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gemchat.toml");
        std::fs::write(&path, "model = [not toml").unwrap();

        let cli = Cli::try_parse_from(["gemchat".into(), "--config".into(), path.into_os_string()])
            .unwrap();
        assert!(resolve_config(&cli).is_err());
    }
}
