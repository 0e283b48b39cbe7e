//! Interactive chat session
//!
//! [`Session`] owns the exchange store, the generator and the formatter for
//! the lifetime of one run. Input is read a line at a time and each turn is
//! finished (reply printed, memory persisted) before the next line is read.

pub mod command;
pub mod prompt;

pub use command::Command;
pub use prompt::{build_prompt, current_timestamp};

use crate::config::OnError;
use crate::error::{GemchatError, Result};
use crate::llm::TextGenerator;
use crate::memory::{Exchange, ExchangeStore};
use crate::output::OutputFormatter;
use anyhow::Context;
use std::io::{BufRead, Write};
use std::time::Instant;

/// What the loop does after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Exit,
    /// A generation call failed under [`OnError::Exit`]
    Abort,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `exit` or end of input
    Exited,
    /// Ended by a failed generation call
    Aborted,
}

pub struct Session<G> {
    generator: G,
    store: ExchangeStore,
    formatter: OutputFormatter,
    on_error: OnError,
    clock: fn() -> String,
}

impl<G: TextGenerator> Session<G> {
    pub fn new(generator: G, store: ExchangeStore) -> Self {
        Self {
            generator,
            store,
            formatter: OutputFormatter::new(),
            on_error: OnError::default(),
            clock: current_timestamp,
        }
    }

    pub fn with_formatter(mut self, formatter: OutputFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_error_policy(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    /// Replace the timestamp source used in prompts
    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &ExchangeStore {
        &self.store
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Run the loop until `exit`, end of input, or a fatal generation error.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> anyhow::Result<SessionEnd> {
        tracing::info!(
            "Session started: model={} memory={} remembered={} on_error={}",
            self.generator.model(),
            self.store.path().display(),
            self.store.len(),
            self.on_error
        );
        self.formatter
            .print_banner(out, self.generator.model(), self.store.len())?;

        let mut buf = Vec::new();
        loop {
            self.formatter.print_prompt(out)?;

            buf.clear();
            let read = input
                .read_until(b'\n', &mut buf)
                .context("Failed to read input")?;
            if read == 0 {
                writeln!(out)?;
                tracing::info!("Input closed, ending session");
                return Ok(SessionEnd::Exited);
            }
            // Invalid UTF-8 is replaced rather than ending the session
            let line = String::from_utf8_lossy(&buf);

            match self.handle_line(&line, out).await? {
                TurnOutcome::Continue => {}
                TurnOutcome::Exit => {
                    tracing::info!("Session ended by user");
                    return Ok(SessionEnd::Exited);
                }
                TurnOutcome::Abort => {
                    tracing::warn!("Session aborted after a failed generation call");
                    return Ok(SessionEnd::Aborted);
                }
            }
        }
    }

    /// Handle one line of input.
    ///
    /// Generation failures are reported on `out` and mapped to an outcome by
    /// the error policy; only console write failures are returned as errors.
    pub async fn handle_line<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> anyhow::Result<TurnOutcome> {
        match Command::parse(line) {
            Command::Empty => Ok(TurnOutcome::Continue),
            Command::Exit => Ok(TurnOutcome::Exit),
            Command::ShowMemory => {
                self.formatter.print_memory(out, self.store.recent())?;
                Ok(TurnOutcome::Continue)
            }
            Command::Forget => {
                self.store.clear();
                self.formatter.print_forgotten(out)?;
                Ok(TurnOutcome::Continue)
            }
            Command::Query(query) => match self.ask(&query, out).await {
                Ok(_) => Ok(TurnOutcome::Continue),
                Err(GemchatError::Io(e)) => Err(e).context("Failed to write output"),
                Err(e) => {
                    self.formatter.print_api_error(out, e.user_message())?;
                    Ok(match self.on_error {
                        OnError::Exit => TurnOutcome::Abort,
                        OnError::Continue => TurnOutcome::Continue,
                    })
                }
            },
        }
    }

    /// One normal turn: prompt with recent memory, print the reply, record it.
    ///
    /// The query is trimmed before it is sent and stored.
    pub async fn ask<W: Write>(&mut self, query: &str, out: &mut W) -> Result<String> {
        let query = query.trim();
        let prompt = build_prompt(&(self.clock)(), self.store.recent(), query);

        let started = Instant::now();
        tracing::debug!(
            "Sending prompt: {} chars, {} remembered exchange(s)",
            prompt.len(),
            self.store.recent().len()
        );
        let reply = self.generator.generate(&prompt).await?;
        tracing::debug!("Reply received in {:?}", started.elapsed());

        self.formatter.print_reply(out, &reply)?;
        self.store.record(Exchange::new(query, reply.clone()));
        Ok(reply)
    }
}
