//! Styled terminal output

use crate::config::CliConfig;
use console::{style, Term};

/// Writes status lines to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Printer {
    /// Printer honoring the CLI color and verbosity settings
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            term: Term::stdout(),
            use_color: config.color.should_color(),
            quiet: config.verbosity.is_quiet(),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.line(&success_prefix(self.use_color), message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        self.line(&failure_prefix(self.use_color), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print raw text (reports, YAML) regardless of quiet mode
    pub fn raw(&self, text: &str) {
        let _ = self.term.write_str(text);
        if !text.ends_with('\n') {
            let _ = self.term.write_line("");
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }
}

fn success_prefix(use_color: bool) -> String {
    if use_color {
        style("✓").green().bold().to_string()
    } else {
        "PASS".to_string()
    }
}

fn failure_prefix(use_color: bool) -> String {
    if use_color {
        style("✗").red().bold().to_string()
    } else {
        "FAIL".to_string()
    }
}
