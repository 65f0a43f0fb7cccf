//! Attempt summary report.
//!
//! # Architecture
//!
//! ```text
//! AttemptLedger ──► chain ──────┐
//!              ├──► insight ────┤
//!              ├──► tabs/cards ─┼──► SUMMARY template ──► ReportDocument
//!              │     └─ failure panel (per failed attempt)
//!              └──► diff ───────┘
//! ```
//!
//! Rendering is a pure function of the ledger, the loaded evidence and the
//! options: the same input always produces byte-identical HTML.
//!
//! ## Toyota Way Application
//!
//! - **Genchi Genbutsu**: the panel shows the actual screenshot, URL and console
//! - **Poka-Yoke**: a placeholder without a value fails the render instead of
//!   shipping a half-filled page

pub mod assets;
pub mod cards;
pub mod chain;
pub mod diff;
pub mod failure_panel;
pub mod insight;
pub mod template;

pub use failure_panel::render_failure_panel_document;

use crate::artifacts::TestId;
use crate::config::SuiteConfig;
use crate::ledger::AttemptLedger;
use crate::result::{SwagError, SwagResult};
use std::path::PathBuf;
use template::{render, Values};

/// Default command opening a trace archive
pub const DEFAULT_TRACE_VIEWER_COMMAND: &str = "swagcheck show-trace";

/// Inputs to rendering beyond the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Run root; trace commands `cd` here
    pub root: PathBuf,
    /// Command that opens a trace archive
    pub trace_viewer_command: String,
}

impl ReportOptions {
    /// Options rooted at `root` with the default viewer command
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            trace_viewer_command: DEFAULT_TRACE_VIEWER_COMMAND.to_string(),
        }
    }

    /// Options taken from the suite configuration
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self::new(config.root.clone()).with_trace_viewer_command(config.trace_viewer_command.clone())
    }

    /// Override the viewer command
    #[must_use]
    pub fn with_trace_viewer_command(mut self, command: impl Into<String>) -> Self {
        self.trace_viewer_command = command.into();
        self
    }
}

/// A rendered HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Document title
    pub title: String,
    /// Complete HTML
    pub html: String,
}

/// Render the attempt summary of `test`
pub fn render_attempt_summary(
    test: &TestId,
    ledger: &AttemptLedger,
    options: &ReportOptions,
) -> SwagResult<ReportDocument> {
    let records = ledger.records();
    let last = ledger
        .last()
        .ok_or_else(|| SwagError::ledger(format!("{test}: no attempts to summarize")))?
        .attempt;
    let title = format!("Attempt Summary: {}", test.full_name());

    let html = render(
        "summary",
        assets::SUMMARY,
        &Values::new()
            .text("title", title.clone())
            .markup("css", assets::CSS)
            .markup("chain", chain::render_chain(records)?)
            .markup("insight", insight::render_insight(records)?)
            .markup("tabs", cards::render_tabs(records, last)?)
            .markup("cards", cards::render_cards(records, last, options)?)
            .markup("diff", diff::render_diff(records)?)
            .markup("script", assets::SCRIPT)
            .text("initial", last.to_string()),
    )?;
    tracing::debug!(test = %test, attempts = records.len(), "attempt summary rendered");
    Ok(ReportDocument { title, html })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AttemptRecord;
    use std::time::Duration;

    fn test_id() -> TestId {
        TestId::new("cart_test", "test_cart_badge").with_class("TestCart")
    }

    fn ledger(outcomes: &[Option<&str>]) -> AttemptLedger {
        let mut ledger = AttemptLedger::new();
        for outcome in outcomes {
            let n = ledger.next_attempt();
            let record = match outcome {
                Some(error) => AttemptRecord::failed(n, Duration::from_millis(1500), *error)
                    .with_url("https://shop.test/cart.html"),
                None => AttemptRecord::passed(n, Duration::from_millis(900)),
            };
            ledger.append(record).unwrap();
        }
        ledger
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_flaky_summary() {
            let ledger = ledger(&[Some("AssertionError: 2 != 3"), Some("AssertionError: 2 != 3"), None]);
            let doc = render_attempt_summary(&test_id(), &ledger, &ReportOptions::new(".")).unwrap();
            assert!(doc.title.contains("test_cart_badge"));
            assert!(doc.html.contains("Attempt 2 ❌</span><span class=\"arrow\">→</span>"));
            assert!(doc.html.contains("Failed 2 times, then passed on retry"));
            assert!(doc.html.contains("Likely flaky test (unstable behavior)"));
            assert!(doc.html.contains("Same error across failed attempts"));
            assert!(doc.html.contains("show(3);"));
            assert_eq!(doc.html.matches("class=\"card active\"").count(), 1);
            assert_eq!(doc.html.matches("class=\"failure-panel\"").count(), 2);
        }

        #[test]
        fn test_all_failed_summary() {
            let ledger = ledger(&[Some("a"), Some("b")]);
            let doc = render_attempt_summary(&test_id(), &ledger, &ReportOptions::new(".")).unwrap();
            assert!(doc.html.contains("Attempts: 2 failures"));
            assert!(doc.html.contains("All 2 attempts failed"));
            assert!(doc.html.contains("Error message changed between attempts"));
            assert!(doc.html.contains("🛑 Error Differences"));
            assert!(!doc.html.contains("🌍 URL Differences"));
        }

        #[test]
        fn test_render_is_deterministic() {
            let ledger = ledger(&[Some("boom"), None]);
            let options = ReportOptions::new(".");
            let first = render_attempt_summary(&test_id(), &ledger, &options).unwrap();
            let second = render_attempt_summary(&test_id(), &ledger, &options).unwrap();
            assert_eq!(first, second);
        }

        #[test]
        fn test_empty_ledger_rejected() {
            let err = render_attempt_summary(&test_id(), &AttemptLedger::new(), &ReportOptions::new("."))
                .unwrap_err();
            assert!(matches!(err, SwagError::Ledger { .. }));
        }

        #[test]
        fn test_error_text_is_escaped() {
            let ledger = ledger(&[Some("<script>alert(1)</script>")]);
            let doc = render_attempt_summary(&test_id(), &ledger, &ReportOptions::new(".")).unwrap();
            assert!(!doc.html.contains("<script>alert(1)"));
            assert!(doc.html.contains("&lt;script&gt;alert(1)"));
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = SuiteConfig::default()
            .with_root("/runs/42")
            .with_trace_viewer_command("trace-viewer --open");
        let options = ReportOptions::from_config(&config);
        assert_eq!(options.root, PathBuf::from("/runs/42"));
        assert_eq!(options.trace_viewer_command, "trace-viewer --open");
    }
}
