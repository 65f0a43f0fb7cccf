//! Per-attempt context/page lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  open   ┌────────────────┐  run_body  ┌─────────────┐  teardown  ┌──────────┐
//! │ Created  │ ──────► │ TracingStarted │ ─────────► │ BodyRunning │ ─────────► │ TornDown │
//! └──────────┘         └────────────────┘            └─────────────┘            └──────────┘
//!      │ setup error: recorded as the attempt's failure, body skipped              ▲
//!      └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **open**: transient `videos/attempt_<N>` + `tracing/attempt_<N>`, new context
//!   (login state iff `need_login`), tracing, page, console subscription
//! - **run_body**: runs the body, then the post-call hook (evidence on failure,
//!   ledger append always)
//! - **teardown**: close page, stop tracing, close context (always), then drop
//!   or promote the transient files and enrich the ledger
//!
//! ## Toyota Way Application
//!
//! - **Jidoka**: every failure leaves a complete evidence bundle behind
//! - **Poka-Yoke**: `Drop` closes a context that never reached teardown

use crate::artifacts::{
    attempt_dir_name, list_videos, move_file, remove_dir_if_exists, ArtifactBundle, RunLayout,
    TestId, TRACE_FILE,
};
use crate::attachment::{
    failure_panel_name, Attachment, AttachmentKind, ATTEMPT_SUMMARY, OPEN_TRACE_COMMAND, TRACE,
    TRACE_VIEWER, VIDEO,
};
use crate::config::SuiteConfig;
use crate::driver::trace::extract_trace;
use crate::driver::{Browser, BrowserContext, ContextOptions, Page, TraceOptions};
use crate::evidence::{ConsoleLog, ConsoleRegistry, EvidenceCollector, FailureEvidence};
use crate::ledger::{AttemptLedger, AttemptRecord, AttemptStatus, Enrichment};
use crate::report::failure_panel::{render_trace_command_document, render_trace_viewer_document};
use crate::report::{render_attempt_summary, render_failure_panel_document, ReportDocument, ReportOptions};
use crate::result::{SwagError, SwagResult};
use crate::session::Session;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Marker requesting the persisted login state
pub const NEED_LOGIN: &str = "need_login";

/// Failure raised by a test body
#[derive(Debug, Error)]
pub enum BodyError {
    /// Business assertion failed
    #[error("{0}")]
    Assertion(String),

    /// Browser-observed failure (navigation, missing element, timeout)
    #[error(transparent)]
    Driver(#[from] SwagError),
}

impl BodyError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }
}

/// Result of a test body
pub type BodyResult = Result<(), BodyError>;

/// Fail with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> BodyResult {
    if condition {
        Ok(())
    } else {
        Err(BodyError::assertion(message))
    }
}

/// Fail with `AssertionError: <actual> != <expected>` unless equal
pub fn ensure_eq<T: PartialEq + Debug>(actual: T, expected: T) -> BodyResult {
    if actual == expected {
        Ok(())
    } else {
        Err(BodyError::assertion(format!(
            "AssertionError: {actual:?} != {expected:?}"
        )))
    }
}

/// Per-test execution state carried through setup, body and teardown
#[derive(Debug)]
pub struct TestItem {
    id: TestId,
    markers: BTreeSet<String>,
    execution_count: u32,
    failed: bool,
    ledger: AttemptLedger,
    attachments: Vec<Attachment>,
    summary: Option<ReportDocument>,
}

impl TestItem {
    /// Create an item that has not run yet
    #[must_use]
    pub fn new(id: TestId) -> Self {
        Self {
            id,
            markers: BTreeSet::new(),
            execution_count: 0,
            failed: false,
            ledger: AttemptLedger::new(),
            attachments: Vec::new(),
            summary: None,
        }
    }

    /// Add a marker
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }

    /// Identity
    #[must_use]
    pub const fn id(&self) -> &TestId {
        &self.id
    }

    /// Whether `marker` is set
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Whether the item runs with the persisted login state
    #[must_use]
    pub fn needs_login(&self) -> bool {
        self.has_marker(NEED_LOGIN)
    }

    /// Current attempt number (0 before the first attempt)
    #[must_use]
    pub const fn execution_count(&self) -> u32 {
        self.execution_count
    }

    /// Whether the current attempt's call phase failed
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// Attempt records so far
    #[must_use]
    pub const fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    /// Queued report attachments
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Queue a report attachment
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Attempt summary, once rendered
    #[must_use]
    pub const fn summary(&self) -> Option<&ReportDocument> {
        self.summary.as_ref()
    }

    /// Split into ledger, attachments and summary
    #[must_use]
    pub fn into_parts(self) -> (TestId, AttemptLedger, Vec<Attachment>, Option<ReportDocument>) {
        (self.id, self.ledger, self.attachments, self.summary)
    }

    fn begin_attempt(&mut self) -> u32 {
        self.execution_count += 1;
        self.failed = false;
        self.execution_count
    }
}

/// What a test body sees
pub struct BodyContext<'a> {
    page: &'a mut dyn Page,
    config: &'a SuiteConfig,
    attempt: u32,
}

impl BodyContext<'_> {
    /// The attempt's page
    pub fn page(&mut self) -> &mut dyn Page {
        &mut *self.page
    }

    /// Suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        self.config
    }

    /// Attempt number
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Navigate to a path of the application under test
    pub fn goto(&mut self, path: &str) -> SwagResult<()> {
        let url = self.config.url(path);
        self.page.goto(&url)
    }
}

/// Lifecycle phase of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    /// Scope exists; tracing not running
    Created,
    /// Context, tracing and page ready
    TracingStarted,
    /// Body executed
    BodyRunning,
    /// Context closed, artifacts settled
    TornDown,
}

enum CallOutcome {
    Passed,
    Failed {
        error: String,
        assertion: Option<String>,
    },
}

/// One attempt's browser resources and transient directories
pub struct AttemptScope {
    test: TestId,
    attempt: u32,
    phase: AttemptPhase,
    config: SuiteConfig,
    layout: RunLayout,
    consoles: ConsoleRegistry,
    context: Option<Box<dyn BrowserContext>>,
    page: Option<Box<dyn Page>>,
    console: Option<ConsoleLog>,
    setup_error: Option<SwagError>,
    tracing_started: bool,
}

impl std::fmt::Debug for AttemptScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttemptScope")
            .field("test", &self.test)
            .field("attempt", &self.attempt)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl AttemptScope {
    /// Open the next attempt of `item`.
    ///
    /// Browser-side setup failures do not return an error: they are kept and
    /// become the attempt's failure in [`AttemptScope::run_body`].
    pub fn open(session: &mut Session, item: &mut TestItem) -> Self {
        let attempt = item.begin_attempt();
        let mut scope = Self {
            test: item.id.clone(),
            attempt,
            phase: AttemptPhase::Created,
            config: session.config().clone(),
            layout: session.layout().clone(),
            consoles: session.consoles().clone(),
            context: None,
            page: None,
            console: None,
            setup_error: None,
            tracing_started: false,
        };
        if let Err(e) = scope.setup(session.browser(), item.needs_login()) {
            tracing::warn!(test = %scope.test, attempt, error = %e, "attempt setup failed");
            scope.setup_error = Some(e);
        } else {
            tracing::info!(test = %scope.test, attempt, "attempt opened");
        }
        scope
    }

    fn setup(&mut self, browser: &mut dyn Browser, needs_login: bool) -> SwagResult<()> {
        let video_dir = self.layout.transient_video_dir(self.attempt);
        fs::create_dir_all(&video_dir)?;
        fs::create_dir_all(self.layout.transient_trace_dir(self.attempt))?;

        let mut options = ContextOptions::new()
            .with_video(&video_dir, self.config.video_size)
            .with_no_viewport();
        if needs_login {
            options = options.with_storage_state(self.layout.login_state());
        }
        let context = self.context.insert(browser.new_context(&options)?);
        context.start_tracing(&TraceOptions::full(attempt_dir_name(self.attempt)))?;
        self.tracing_started = true;
        self.phase = AttemptPhase::TracingStarted;

        let mut page = context.new_page()?;
        let log = self.consoles.register(page.id());
        page.on_console(log.listener());
        self.page = Some(page);
        self.console = Some(log);
        Ok(())
    }

    /// Attempt number
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> AttemptPhase {
        self.phase
    }

    /// Run `body`, then the post-call hook.
    ///
    /// Panics inside the body are caught and recorded as assertion failures.
    pub fn run_body<F>(&mut self, item: &mut TestItem, body: F) -> SwagResult<AttemptStatus>
    where
        F: FnOnce(&mut BodyContext<'_>) -> BodyResult,
    {
        if self.phase == AttemptPhase::BodyRunning || self.phase == AttemptPhase::TornDown {
            return Err(SwagError::invalid_state(format!(
                "attempt {} body already ran",
                self.attempt
            )));
        }
        let started = Instant::now();
        let outcome = if let Some(e) = self.setup_error.take() {
            CallOutcome::Failed {
                error: format!("setup failed: {e}"),
                assertion: None,
            }
        } else if let Some(page) = self.page.as_mut() {
            self.phase = AttemptPhase::BodyRunning;
            let mut ctx = BodyContext {
                page: page.as_mut(),
                config: &self.config,
                attempt: self.attempt,
            };
            match catch_unwind(AssertUnwindSafe(|| body(&mut ctx))) {
                Ok(Ok(())) => CallOutcome::Passed,
                Ok(Err(BodyError::Assertion(message))) => CallOutcome::Failed {
                    error: message.clone(),
                    assertion: Some(message),
                },
                Ok(Err(BodyError::Driver(e))) => CallOutcome::Failed {
                    error: e.to_string(),
                    assertion: None,
                },
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    CallOutcome::Failed {
                        error: message.clone(),
                        assertion: Some(message),
                    }
                }
            }
        } else {
            CallOutcome::Failed {
                error: "setup failed: no page available".to_string(),
                assertion: None,
            }
        };
        self.phase = AttemptPhase::BodyRunning;
        let duration = started.elapsed();
        self.post_call(item, outcome, duration)
    }

    fn post_call(
        &mut self,
        item: &mut TestItem,
        outcome: CallOutcome,
        duration: Duration,
    ) -> SwagResult<AttemptStatus> {
        match outcome {
            CallOutcome::Passed => {
                item.ledger
                    .append(AttemptRecord::passed(self.attempt, duration))?;
                tracing::info!(test = %self.test, attempt = self.attempt, "attempt passed");
                Ok(AttemptStatus::Passed)
            }
            CallOutcome::Failed { error, assertion } => {
                item.failed = true;
                let dir = self.layout.attempt_dir(&self.test, self.attempt);
                let report = match self.page.as_mut() {
                    Some(page) => EvidenceCollector::capture(
                        Some(page.as_mut()),
                        self.console.as_ref(),
                        &dir,
                        assertion.as_deref(),
                        &mut item.attachments,
                    ),
                    None => EvidenceCollector::capture(
                        None,
                        self.console.as_ref(),
                        &dir,
                        assertion.as_deref(),
                        &mut item.attachments,
                    ),
                };
                tracing::info!(test = %self.test, attempt = self.attempt, error = %error, "attempt failed");
                let mut record = AttemptRecord::failed(self.attempt, duration, error);
                if let Some(url) = report.url {
                    record = record.with_url(url);
                }
                item.ledger.append(record)?;
                Ok(AttemptStatus::Failed)
            }
        }
    }

    /// Close everything, then settle artifacts for the attempt.
    ///
    /// The context is closed even when stopping the trace fails. Artifact
    /// promotion, transient cleanup and the final summary are best-effort:
    /// a failing step is logged and the ledger survives.
    pub fn teardown(&mut self, item: &mut TestItem) -> SwagResult<()> {
        if self.phase == AttemptPhase::TornDown {
            return Ok(());
        }
        self.close_browser_side();
        self.phase = AttemptPhase::TornDown;

        if item.failed {
            self.promote(item);
        }
        for dir in [
            self.layout.transient_video_dir(self.attempt),
            self.layout.transient_trace_dir(self.attempt),
        ] {
            if let Err(e) = remove_dir_if_exists(&dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "transient dir not removed");
            }
        }

        let passed = !item.failed;
        let is_final = passed || self.attempt >= self.config.max_attempts();
        if is_final && item.ledger.failure_count() > 0 {
            let options = ReportOptions::from_config(&self.config);
            match render_attempt_summary(&self.test, &item.ledger, &options) {
                Ok(summary) => {
                    item.attach(Attachment::text(
                        ATTEMPT_SUMMARY,
                        AttachmentKind::Html,
                        summary.html.clone(),
                    ));
                    item.summary = Some(summary);
                }
                Err(e) => tracing::warn!(test = %self.test, error = %e, "attempt summary not rendered"),
            }
        }
        tracing::debug!(test = %self.test, attempt = self.attempt, "attempt torn down");
        Ok(())
    }

    fn close_browser_side(&mut self) {
        if let Some(mut page) = self.page.take() {
            self.consoles.remove(page.id());
            if let Err(e) = page.close() {
                tracing::warn!(error = %e, "page close failed");
            }
        }
        if let Some(mut context) = self.context.take() {
            if self.tracing_started {
                let trace_path = self.layout.transient_trace_dir(self.attempt).join(TRACE_FILE);
                if let Err(e) = context.stop_tracing(&trace_path) {
                    tracing::warn!(attempt = self.attempt, error = %e, "stopping tracing failed");
                }
            }
            if let Err(e) = context.close() {
                tracing::warn!(attempt = self.attempt, error = %e, "context close failed");
            }
        }
        self.console = None;
    }

    /// Move video and trace into the attempt dir; each file on its own
    fn move_transient(&self, target: &Path) {
        let video_dir = self.layout.transient_video_dir(self.attempt);
        let videos = list_videos(&video_dir).unwrap_or_else(|e| {
            tracing::warn!(dir = %video_dir.display(), error = %e, "videos not listed");
            Vec::new()
        });
        let trace = self.layout.transient_trace_dir(self.attempt).join(TRACE_FILE);
        let moves = videos
            .iter()
            .filter_map(|v| v.file_name().map(|name| (v.clone(), target.join(name))))
            .chain(trace.is_file().then(|| (trace.clone(), target.join(TRACE_FILE))));
        for (from, to) in moves {
            if let Err(e) = move_file(&from, &to) {
                tracing::warn!(from = %from.display(), error = %e, "artifact not promoted");
            }
        }
    }

    fn promote(&self, item: &mut TestItem) {
        let target = self.layout.attempt_dir(&self.test, self.attempt);
        if let Err(e) = fs::create_dir_all(&target) {
            tracing::warn!(dir = %target.display(), error = %e, "attempt dir not created");
        }
        self.move_transient(&target);

        let bundle = ArtifactBundle::scan(&target).unwrap_or_else(|e| {
            tracing::warn!(dir = %target.display(), error = %e, "attempt dir not scanned");
            ArtifactBundle {
                dir: target.clone(),
                ..ArtifactBundle::default()
            }
        });
        let url = bundle.recorded_url().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "recorded url not read");
            None
        });
        let evidence = match FailureEvidence::load(&target) {
            Ok(evidence) => Some(evidence),
            Err(e) => {
                tracing::warn!(error = %e, "evidence could not be reloaded");
                None
            }
        };
        let enriched = item.ledger.enrich(
            self.attempt,
            Enrichment {
                artifacts: bundle.flags(),
                url,
                artifact_dir: Some(target.clone()),
                evidence,
            },
        );
        if let Err(e) = enriched {
            tracing::warn!(attempt = self.attempt, error = %e, "attempt record not enriched");
        }
        tracing::info!(dir = %target.display(), "attempt artifacts promoted");

        for video in &bundle.videos {
            item.attach(Attachment::file(VIDEO, AttachmentKind::Webm, video));
        }
        let options = ReportOptions::from_config(&self.config);
        if let Some(trace) = &bundle.trace {
            match extract_trace(trace).and_then(|dir| render_trace_viewer_document(&dir)) {
                Ok(viewer) => item.attach(Attachment::text(TRACE_VIEWER, AttachmentKind::Html, viewer.html)),
                Err(e) => tracing::warn!(error = %e, "trace extraction failed"),
            }
            item.attach(Attachment::file(TRACE, AttachmentKind::Zip, trace));
            match render_trace_command_document(trace, &options) {
                Ok(command) => item.attach(Attachment::text(
                    OPEN_TRACE_COMMAND,
                    AttachmentKind::Html,
                    command.html,
                )),
                Err(e) => tracing::warn!(error = %e, "trace command not rendered"),
            }
        }
        if let Some(record) = item.ledger.get(self.attempt) {
            match render_failure_panel_document(record, &options) {
                Ok(panel) => item.attach(Attachment::text(
                    failure_panel_name(self.attempt),
                    AttachmentKind::Html,
                    panel.html,
                )),
                Err(e) => tracing::warn!(attempt = self.attempt, error = %e, "failure panel not rendered"),
            }
        }
    }

    /// Transient video directory of this attempt
    #[must_use]
    pub fn transient_video_dir(&self) -> PathBuf {
        self.layout.transient_video_dir(self.attempt)
    }
}

impl Drop for AttemptScope {
    fn drop(&mut self) {
        if self.phase != AttemptPhase::TornDown && (self.context.is_some() || self.page.is_some()) {
            tracing::warn!(test = %self.test, attempt = self.attempt, "attempt dropped before teardown; closing context");
            self.close_browser_side();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "test body panicked".to_string())
}

/// Run one full attempt: open, body + post-call hook, teardown
pub fn run_attempt<F>(session: &mut Session, item: &mut TestItem, body: F) -> SwagResult<AttemptStatus>
where
    F: FnOnce(&mut BodyContext<'_>) -> BodyResult,
{
    let mut scope = AttemptScope::open(session, item);
    let status = scope.run_body(item, body)?;
    scope.teardown(item)?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{CONSOLE_FILE, FAILURE_TEXT_FILE, SCREENSHOT_FILE, URL_FILE};
    use crate::driver::simulated::{Faults, SimulatedEngine, SiteModel};
    use crate::page_object::locators;
    use std::path::Path;

    const BASE: &str = "https://shop.test";

    fn start(root: &Path, faults: Faults, retries: u32) -> (SimulatedEngine, Session) {
        let config = SuiteConfig::default()
            .with_root(root)
            .with_base_url(BASE)
            .with_max_retries(retries);
        let site = SiteModel::saucedemo(BASE, config.credentials.clone())
            .with_console_error("/cart.html", "Failed to load resource: 500");
        let engine = SimulatedEngine::new(site).with_faults(faults);
        let session = Session::start(&engine, config).unwrap();
        (engine, session)
    }

    fn cart_item() -> TestItem {
        TestItem::new(TestId::new("cart_test", "test_cart_badge").with_class("TestCart"))
            .with_marker(NEED_LOGIN)
    }

    fn failing_cart_body(ctx: &mut BodyContext<'_>) -> BodyResult {
        ctx.goto("/inventory.html")?;
        ctx.page().click("[data-test='add-to-cart-sauce-labs-backpack']")?;
        ctx.page().click("[data-test='add-to-cart-sauce-labs-bike-light']")?;
        let badge = ctx.page().text_content(locators::CART_BADGE)?.unwrap_or_default();
        ctx.page().click(locators::CART_LINK)?;
        ensure_eq(badge.parse::<u32>().unwrap_or(0), 3)
    }

    mod helper_tests {
        use super::*;

        #[test]
        fn test_ensure_eq_message() {
            let err = ensure_eq(2, 3).unwrap_err();
            assert_eq!(err.to_string(), "AssertionError: 2 != 3");
            assert!(ensure(true, "x").is_ok());
        }

        #[test]
        fn test_panic_message_variants() {
            let payload: Box<dyn Any + Send> = Box::new("static str");
            assert_eq!(panic_message(payload.as_ref()), "static str");
            let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
            assert_eq!(panic_message(payload.as_ref()), "owned");
            let payload: Box<dyn Any + Send> = Box::new(42_u8);
            assert_eq!(panic_message(payload.as_ref()), "test body panicked");
        }

        #[test]
        fn test_item_markers() {
            let item = cart_item();
            assert!(item.needs_login());
            assert_eq!(item.execution_count(), 0);
            assert!(!TestItem::new(TestId::new("m", "t")).needs_login());
        }
    }

    mod passed_attempt_tests {
        use super::*;

        #[test]
        fn test_passed_attempt_leaves_nothing_behind() {
            let dir = tempfile::tempdir().unwrap();
            let (engine, mut session) = start(dir.path(), Faults::default(), 1);
            let mut item = cart_item();

            let status = run_attempt(&mut session, &mut item, |ctx| {
                ctx.goto("/inventory.html")?;
                ensure(ctx.page().url()?.ends_with("/inventory.html"), "not on inventory")
            })
            .unwrap();

            assert_eq!(status, AttemptStatus::Passed);
            assert!(!dir.path().join("videos/attempt_1").exists());
            assert!(!dir.path().join("tracing/attempt_1").exists());
            assert!(!session.layout().attempt_dir(item.id(), 1).exists());
            assert_eq!(item.ledger().len(), 1);
            assert!(item.summary().is_none());
            assert!(item.attachments().is_empty());
            assert_eq!(engine.stats().open_contexts(), 0);
            assert!(session.consoles().is_empty());
        }

        #[test]
        fn test_without_marker_is_logged_out() {
            let dir = tempfile::tempdir().unwrap();
            let (_engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = TestItem::new(TestId::new("login_test", "test_redirect"));
            let status = run_attempt(&mut session, &mut item, |ctx| {
                ctx.goto("/cart.html")?;
                ensure_eq(ctx.page().url()?, format!("{BASE}/"))
            })
            .unwrap();
            assert_eq!(status, AttemptStatus::Passed);
        }
    }

    mod failed_attempt_tests {
        use super::*;

        #[test]
        fn test_failed_attempt_promotes_bundle() {
            let dir = tempfile::tempdir().unwrap();
            let (engine, mut session) = start(dir.path(), Faults::default(), 1);
            let mut item = cart_item();

            let status = run_attempt(&mut session, &mut item, failing_cart_body).unwrap();
            assert_eq!(status, AttemptStatus::Failed);

            let target = dir
                .path()
                .join("artifacts/cart_test/TestCart/test_cart_badge/attempt_1");
            assert!(fs::metadata(target.join(SCREENSHOT_FILE)).unwrap().len() > 0);
            assert_eq!(
                fs::read_to_string(target.join(URL_FILE)).unwrap(),
                "https://shop.test/cart.html"
            );
            assert!(fs::read_to_string(target.join(CONSOLE_FILE))
                .unwrap()
                .contains("Failed to load resource: 500"));
            assert_eq!(
                fs::read_to_string(target.join(FAILURE_TEXT_FILE)).unwrap(),
                "AssertionError: 2 != 3"
            );
            assert!(target.join(TRACE_FILE).is_file());
            assert!(target.join("trace-viewer/trace.json").is_file());
            assert_eq!(list_videos(&target).unwrap().len(), 1);
            assert!(!dir.path().join("videos/attempt_1").exists());

            let record = item.ledger().get(1).unwrap();
            assert!(record.is_enriched());
            assert!(record.artifacts.screenshot && record.artifacts.video && record.artifacts.trace);
            assert_eq!(record.url.as_deref(), Some("https://shop.test/cart.html"));
            assert!(record.evidence.is_some());

            let names: Vec<&str> = item.attachments().iter().map(|a| a.name.as_str()).collect();
            for expected in [
                "Failure Screenshot",
                "Page URL",
                "Console Errors",
                "Video",
                "Trace Viewer",
                "Trace",
                "Open Trace Command",
                "Failure Panel (Attempt 1)",
            ] {
                assert!(names.contains(&expected), "missing {expected}");
            }
            // one retry left: not final yet
            assert!(item.summary().is_none());
            assert_eq!(engine.stats().open_contexts(), 0);
        }

        #[test]
        fn test_last_attempt_failure_renders_summary() {
            let dir = tempfile::tempdir().unwrap();
            let (_engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            run_attempt(&mut session, &mut item, failing_cart_body).unwrap();
            let summary = item.summary().unwrap();
            assert!(summary.html.contains("All 1 attempts failed"));
            assert!(item
                .attachments()
                .iter()
                .any(|a| a.name == ATTEMPT_SUMMARY));
        }

        #[test]
        fn test_panic_recorded_as_assertion() {
            let dir = tempfile::tempdir().unwrap();
            let (_engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            let status = run_attempt(&mut session, &mut item, |_ctx| -> BodyResult {
                panic!("cart total mismatch");
            })
            .unwrap();
            assert_eq!(status, AttemptStatus::Failed);
            let record = item.ledger().get(1).unwrap();
            assert_eq!(record.error.as_deref(), Some("cart total mismatch"));
            let target = session.layout().attempt_dir(item.id(), 1);
            assert!(target.join(FAILURE_TEXT_FILE).is_file());
        }

        #[test]
        fn test_driver_error_has_no_failure_text() {
            let dir = tempfile::tempdir().unwrap();
            let (_engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            run_attempt(&mut session, &mut item, |ctx| {
                ctx.goto("/inventory.html")?;
                ctx.page().click("[data-test='does-not-exist']")?;
                Ok(())
            })
            .unwrap();
            let record = item.ledger().get(1).unwrap();
            assert!(record.error.as_deref().unwrap().contains("does-not-exist"));
            let target = session.layout().attempt_dir(item.id(), 1);
            assert!(!target.join(FAILURE_TEXT_FILE).exists());
            assert!(target.join(SCREENSHOT_FILE).exists());
        }
    }

    mod hazard_tests {
        use super::*;

        #[test]
        fn test_stop_tracing_failure_still_closes_context() {
            let dir = tempfile::tempdir().unwrap();
            let faults = Faults {
                stop_tracing: true,
                ..Faults::default()
            };
            let (engine, mut session) = start(dir.path(), faults, 0);
            let mut item = cart_item();
            run_attempt(&mut session, &mut item, failing_cart_body).unwrap();

            assert_eq!(engine.stats().open_contexts(), 0);
            let record = item.ledger().get(1).unwrap();
            assert!(!record.artifacts.trace);
            assert!(record.artifacts.video);
            assert!(!item.attachments().iter().any(|a| a.name == TRACE));
        }

        #[test]
        fn test_context_failure_becomes_attempt_failure() {
            let dir = tempfile::tempdir().unwrap();
            let (engine, mut session) = start(dir.path(), Faults::default(), 0);
            engine.set_faults(Faults {
                new_context: true,
                ..Faults::default()
            });
            let mut item = cart_item();
            let mut ran = false;
            let status = run_attempt(&mut session, &mut item, |_ctx| {
                ran = true;
                Ok(())
            })
            .unwrap();

            assert!(!ran);
            assert_eq!(status, AttemptStatus::Failed);
            let record = item.ledger().get(1).unwrap();
            assert!(record.error.as_deref().unwrap().starts_with("setup failed:"));
            assert!(record.url.is_none());
            assert!(!dir.path().join("videos/attempt_1").exists());
            assert_eq!(engine.stats().open_contexts(), 0);
        }

        #[test]
        fn test_blocked_trace_promotion_keeps_ledger() {
            let dir = tempfile::tempdir().unwrap();
            let (engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            let mut scope = AttemptScope::open(&mut session, &mut item);
            let status = scope.run_body(&mut item, failing_cart_body).unwrap();
            assert_eq!(status, AttemptStatus::Failed);

            // a directory where the trace archive should land
            let target = session.layout().attempt_dir(item.id(), 1);
            fs::create_dir_all(target.join(TRACE_FILE)).unwrap();
            scope.teardown(&mut item).unwrap();

            assert!(!dir.path().join("videos/attempt_1").exists());
            assert!(!dir.path().join("tracing/attempt_1").exists());
            let record = item.ledger().get(1).unwrap();
            assert!(record.is_enriched());
            assert!(!record.artifacts.trace);
            assert!(record.artifacts.screenshot && record.artifacts.video);
            assert_eq!(record.url.as_deref(), Some("https://shop.test/cart.html"));
            assert!(item.summary().unwrap().html.contains("All 1 attempts failed"));
            assert!(item
                .attachments()
                .iter()
                .any(|a| a.name == "Failure Panel (Attempt 1)"));
            assert_eq!(engine.stats().open_contexts(), 0);
        }

        #[test]
        fn test_drop_without_teardown_closes_context() {
            let dir = tempfile::tempdir().unwrap();
            let (engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            {
                let scope = AttemptScope::open(&mut session, &mut item);
                assert_eq!(scope.phase(), AttemptPhase::TracingStarted);
                assert_eq!(engine.stats().open_contexts(), 1);
            }
            assert_eq!(engine.stats().open_contexts(), 0);
        }

        #[test]
        fn test_body_cannot_run_twice() {
            let dir = tempfile::tempdir().unwrap();
            let (_engine, mut session) = start(dir.path(), Faults::default(), 0);
            let mut item = cart_item();
            let mut scope = AttemptScope::open(&mut session, &mut item);
            scope.run_body(&mut item, |_| Ok(())).unwrap();
            assert!(scope.run_body(&mut item, |_| Ok(())).is_err());
            scope.teardown(&mut item).unwrap();
            scope.teardown(&mut item).unwrap();
            assert_eq!(item.ledger().len(), 1);
        }
    }
}
