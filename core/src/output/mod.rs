//! Output formatting module
//!
//! Everything the session prints goes through [`OutputFormatter`], so the
//! loop can write to stdout in the binary and to a buffer in tests.

use crate::memory::Exchange;
use console::Style;
use std::fmt::Display;
use std::io::{self, Write};

/// Output formatter for console results
pub struct OutputFormatter {
    // Styles
    blue: Style,
    green: Style,
    yellow: Style,
    red: Style,
    bold: Style,
    dim: Style,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self {
            blue: Style::new().blue(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            bold: Style::new().bold(),
            dim: Style::new().dim(),
        }
    }
}

impl OutputFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter that never emits escape codes
    pub fn plain() -> Self {
        Self {
            blue: Style::new(),
            green: Style::new(),
            yellow: Style::new(),
            red: Style::new(),
            bold: Style::new(),
            dim: Style::new(),
        }
    }

    /// Session start line
    pub fn print_banner<W: Write>(
        &self,
        out: &mut W,
        model: &str,
        remembered: usize,
    ) -> io::Result<()> {
        writeln!(
            out,
            "{} {} ({} remembered exchange{}). Commands: {}, {}, {}.",
            self.bold.apply_to("gemchat"),
            self.blue.apply_to(model),
            remembered,
            if remembered == 1 { "" } else { "s" },
            self.yellow.apply_to("show memory"),
            self.yellow.apply_to("forget"),
            self.yellow.apply_to("exit"),
        )
    }

    /// Input prompt, left on the current line
    pub fn print_prompt<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{} ", self.green.apply_to("You:"))?;
        out.flush()
    }

    /// Print the AI reply
    pub fn print_reply<W: Write>(&self, out: &mut W, reply: &str) -> io::Result<()> {
        writeln!(out, "{} {}", self.blue.apply_to("AI:"), reply)
    }

    /// Print stored exchanges as numbered user/ai pairs
    pub fn print_memory<W: Write>(&self, out: &mut W, exchanges: &[Exchange]) -> io::Result<()> {
        if exchanges.is_empty() {
            return writeln!(out, "{}", self.dim.apply_to("(memory is empty)"));
        }

        for (i, exchange) in exchanges.iter().enumerate() {
            writeln!(out, "{}. {} {}", i + 1, self.green.apply_to("user:"), exchange.user)?;
            writeln!(out, "   {} {}", self.blue.apply_to("ai:"), exchange.ai)?;
        }
        Ok(())
    }

    /// Confirm that memory was cleared
    pub fn print_forgotten<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.yellow.apply_to("Memory cleared."))
    }

    /// One-line diagnostic for a failed generation call
    pub fn print_api_error<W: Write>(&self, out: &mut W, err: impl Display) -> io::Result<()> {
        let message = err.to_string();
        let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
        writeln!(out, "{} {}", self.red.apply_to("API call failed:"), message)
    }
}
