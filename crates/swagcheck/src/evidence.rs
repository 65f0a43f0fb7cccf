//! Evidence collection for failed attempts.
//!
//! Console errors are buffered per page while the body runs. When the call
//! phase fails, [`EvidenceCollector::capture`] writes the screenshot, URL and
//! console buffer into the attempt directory. Every step is best-effort: a
//! capture failure is logged and never replaces the test failure.

use crate::artifacts::{CONSOLE_FILE, FAILURE_TEXT_FILE, SCREENSHOT_FILE, URL_FILE};
use crate::attachment::{
    Attachment, AttachmentKind, CONSOLE_ERRORS, FAILURE_SCREENSHOT, PAGE_URL,
};
use crate::driver::{ConsoleListener, ConsoleLocation, ConsoleMessage, Page, PageId};
use crate::result::SwagResult;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One buffered console error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    /// Message type (always `error` for buffered entries)
    #[serde(rename = "type")]
    pub kind: String,
    /// Message text
    pub text: String,
    /// Source location
    pub location: ConsoleLocation,
}

impl From<&ConsoleMessage> for ConsoleEntry {
    fn from(msg: &ConsoleMessage) -> Self {
        Self {
            kind: msg.kind.clone(),
            text: msg.text.clone(),
            location: msg.location.clone(),
        }
    }
}

/// Append-only console error buffer of one page
#[derive(Debug, Clone, Default)]
pub struct ConsoleLog {
    entries: Arc<Mutex<Vec<ConsoleEntry>>>,
}

impl ConsoleLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message if it is an error
    pub fn push(&self, msg: &ConsoleMessage) {
        if msg.is_error() {
            lock(&self.entries).push(ConsoleEntry::from(msg));
        }
    }

    /// Copy of the buffered entries
    #[must_use]
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        lock(&self.entries).clone()
    }

    /// Number of buffered entries
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether nothing was buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listener feeding this log, for [`Page::on_console`]
    #[must_use]
    pub fn listener(&self) -> ConsoleListener {
        let log = self.clone();
        Box::new(move |msg| log.push(msg))
    }

    /// Entries as pretty JSON (two-space indent)
    pub fn to_pretty_json(&self) -> SwagResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }
}

/// Console logs keyed by page, shared with engine listener threads
#[derive(Debug, Clone, Default)]
pub struct ConsoleRegistry {
    logs: Arc<Mutex<HashMap<PageId, ConsoleLog>>>,
}

impl ConsoleRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh log for `page`, replacing any earlier one
    pub fn register(&self, page: PageId) -> ConsoleLog {
        let log = ConsoleLog::new();
        lock(&self.logs).insert(page, log.clone());
        log
    }

    /// Log of `page`
    #[must_use]
    pub fn get(&self, page: PageId) -> Option<ConsoleLog> {
        lock(&self.logs).get(&page).cloned()
    }

    /// Drop the log of a closed page
    pub fn remove(&self, page: PageId) -> Option<ConsoleLog> {
        lock(&self.logs).remove(&page)
    }

    /// Number of live logs
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.logs).len()
    }

    /// Whether no page is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evidence loaded back from an attempt directory for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureEvidence {
    /// URL at failure time
    pub url: Option<String>,
    /// Pretty console JSON
    pub console_json: Option<String>,
    /// Screenshot PNG bytes
    pub screenshot: Option<Vec<u8>>,
}

impl FailureEvidence {
    /// Load whatever evidence files exist in `dir`
    pub fn load(dir: &Path) -> SwagResult<Self> {
        let read_text = |name: &str| -> SwagResult<Option<String>> {
            let path = dir.join(name);
            if path.is_file() {
                Ok(Some(fs::read_to_string(path)?))
            } else {
                Ok(None)
            }
        };
        let screenshot_path = dir.join(SCREENSHOT_FILE);
        let screenshot = if screenshot_path.is_file() {
            Some(fs::read(screenshot_path)?).filter(|b| !b.is_empty())
        } else {
            None
        };
        Ok(Self {
            url: read_text(URL_FILE)?
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            console_json: read_text(CONSOLE_FILE)?,
            screenshot,
        })
    }

    /// Screenshot as a `data:` URI
    #[must_use]
    pub fn screenshot_data_uri(&self) -> Option<String> {
        self.screenshot.as_ref().map(|bytes| {
            format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            )
        })
    }
}

/// What a capture produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Screenshot written
    pub screenshot: bool,
    /// URL written, with its value
    pub url: Option<String>,
    /// Console JSON written
    pub console: bool,
    /// Assertion text written
    pub failure_text: bool,
}

/// Writes failure evidence for one attempt
#[derive(Debug, Default)]
pub struct EvidenceCollector;

impl EvidenceCollector {
    /// Capture evidence into `dir` and queue the matching attachments.
    ///
    /// `assertion` is set for assertion-class failures and is additionally
    /// written to `test_failure_errors.txt`. A missing page skips every
    /// page-based step.
    pub fn capture(
        page: Option<&mut dyn Page>,
        console: Option<&ConsoleLog>,
        dir: &Path,
        assertion: Option<&str>,
        attachments: &mut Vec<Attachment>,
    ) -> CaptureReport {
        let mut report = CaptureReport::default();
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create evidence directory");
            return report;
        }

        if let Some(text) = assertion {
            match fs::write(dir.join(FAILURE_TEXT_FILE), text) {
                Ok(()) => report.failure_text = true,
                Err(e) => tracing::warn!(error = %e, "failure text not written"),
            }
        }

        let Some(page) = page else {
            tracing::warn!("no page available; skipping screenshot, URL and console capture");
            return report;
        };

        let screenshot = dir.join(SCREENSHOT_FILE);
        match page.screenshot(&screenshot, true) {
            Ok(()) => {
                report.screenshot = true;
                attachments.push(Attachment::file(
                    FAILURE_SCREENSHOT,
                    AttachmentKind::Png,
                    &screenshot,
                ));
            }
            Err(e) => tracing::warn!(error = %e, "failure screenshot not captured"),
        }

        match page.url() {
            Ok(url) => match fs::write(dir.join(URL_FILE), &url) {
                Ok(()) => {
                    attachments.push(Attachment::text(PAGE_URL, AttachmentKind::Text, url.clone()));
                    report.url = Some(url);
                }
                Err(e) => tracing::warn!(error = %e, "page URL not written"),
            },
            Err(e) => tracing::warn!(error = %e, "page URL unavailable"),
        }

        let log = console.cloned().unwrap_or_default();
        match log
            .to_pretty_json()
            .and_then(|json| fs::write(dir.join(CONSOLE_FILE), &json).map(|()| json).map_err(Into::into))
        {
            Ok(json) => {
                report.console = true;
                attachments.push(Attachment::text(CONSOLE_ERRORS, AttachmentKind::Json, json));
            }
            Err(e) => tracing::warn!(error = %e, "console errors not written"),
        }

        tracing::info!(dir = %dir.display(), "failure evidence captured");
        report
    }
}
