//! Terminal output
//!
//! Text goes to stdout, diagnostics to stderr. In JSON mode only JSON is
//! written to stdout so results can be piped into other tools.

use colored::Colorize;
use serde::Serialize;

use crate::core::Outcome;
use crate::error::Result;

/// Formats command results as colored text or JSON
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    #[must_use]
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color || json {
            colored::control::set_override(false);
        }
        Self { json }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, message: &str) {
        if !self.json {
            println!("{} {message}", "✓".green().bold());
        }
    }

    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.json {
            eprintln!("{} {message}", "warning:".yellow().bold());
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
    }

    /// Pretty-print any serializable value to stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print an [`Outcome`]
    ///
    /// JSON mode prints the whole object; text mode prints the message and
    /// leaves rendering the payload to `render`.
    pub fn outcome<T: Serialize>(&self, outcome: &Outcome<T>, render: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            return self.print_json(outcome);
        }
        if outcome.ok {
            self.success(&outcome.message);
            if let Some(data) = &outcome.data {
                render(data);
            }
        } else {
            self.error(&outcome.message);
        }
        Ok(())
    }

    /// Dimmed text for secondary columns
    #[must_use]
    pub fn dim(&self, text: &str) -> String {
        text.dimmed().to_string()
    }
}
