//! Retry runner.
//!
//! Plays the test runner's role for one item: attempts `1..=max_retries + 1`
//! through [`run_attempt`] until one passes, then publishes the item's
//! attachments as a result file.
//!
//! ```text
//! attempt 1 ──fail──► attempt 2 ──fail──► … ──► attempt max_retries+1
//!     │                   │                            │
//!     └──pass─────────────┴──pass──────────────────────┴──► TestOutcome ──► report-results/
//! ```

use crate::artifacts::TestId;
use crate::attachment::{ResultSink, TestStatus};
use crate::ledger::{AttemptLedger, AttemptStatus};
use crate::lifecycle::{run_attempt, BodyContext, BodyResult, TestItem};
use crate::report::ReportDocument;
use crate::result::SwagResult;
use crate::session::Session;
use std::path::PathBuf;

/// Final state of one test item
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// Item identity
    pub id: TestId,
    /// Passed, failed, or flaky
    pub status: TestStatus,
    /// Every attempt, in order
    pub ledger: AttemptLedger,
    /// Attempt summary when any attempt failed
    pub summary: Option<ReportDocument>,
    /// Published result file
    pub result_file: Option<PathBuf>,
}

impl TestOutcome {
    /// Attempts executed
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.ledger.len()
    }
}

/// Derive the item status from its ledger
#[must_use]
pub fn classify(ledger: &AttemptLedger) -> TestStatus {
    match ledger.last().map(|r| r.status) {
        Some(AttemptStatus::Passed) if ledger.failure_count() > 0 => TestStatus::Flaky,
        Some(AttemptStatus::Passed) => TestStatus::Passed,
        _ => TestStatus::Failed,
    }
}

/// Runs items with retries
#[derive(Debug, Clone, Default)]
pub struct RetryRunner {
    publish: bool,
    sink: Option<ResultSink>,
}

impl RetryRunner {
    /// Runner publishing into the session's `report-results/`
    #[must_use]
    pub fn new() -> Self {
        Self {
            publish: true,
            sink: None,
        }
    }

    /// Publish into a custom sink
    #[must_use]
    pub fn with_sink(mut self, sink: ResultSink) -> Self {
        self.publish = true;
        self.sink = Some(sink);
        self
    }

    /// Keep attachments in memory only
    #[must_use]
    pub fn without_publishing(mut self) -> Self {
        self.publish = false;
        self
    }

    /// Run `item` until an attempt passes or the retries are exhausted
    pub fn run<F>(&self, session: &mut Session, mut item: TestItem, mut body: F) -> SwagResult<TestOutcome>
    where
        F: FnMut(&mut BodyContext<'_>) -> BodyResult,
    {
        let max_attempts = session.config().max_attempts();
        loop {
            let status = run_attempt(session, &mut item, &mut body)?;
            if status == AttemptStatus::Passed || item.execution_count() >= max_attempts {
                break;
            }
            tracing::info!(
                test = %item.id(),
                next = item.execution_count() + 1,
                max_attempts,
                "retrying"
            );
        }

        let status = classify(item.ledger());
        let attempts = item.execution_count();
        let result_file = if self.publish {
            let sink = self
                .sink
                .clone()
                .unwrap_or_else(|| ResultSink::new(session.layout().report_results()));
            Some(sink.publish(item.id(), status, attempts, item.attachments())?)
        } else {
            None
        };
        let (id, ledger, _attachments, summary) = item.into_parts();
        tracing::info!(test = %id, ?status, attempts, "test finished");
        Ok(TestOutcome {
            id,
            status,
            ledger,
            summary,
            result_file,
        })
    }
}
