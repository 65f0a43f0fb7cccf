//! Report attachments and result files.
//!
//! Attachments are collected on the test item while attempts run. When the
//! item finishes, [`ResultSink::publish`] writes one `<uuid>-result.json` plus
//! one `<uuid>-attachment.<ext>` per attachment into `report-results/`.

use crate::artifacts::TestId;
use crate::result::SwagResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Attachment name for the failure screenshot
pub const FAILURE_SCREENSHOT: &str = "Failure Screenshot";
/// Attachment name for the failure URL
pub const PAGE_URL: &str = "Page URL";
/// Attachment name for buffered console errors
pub const CONSOLE_ERRORS: &str = "Console Errors";
/// Attachment name for the attempt video
pub const VIDEO: &str = "Video";
/// Attachment name for the trace archive
pub const TRACE: &str = "Trace";
/// Attachment name for the copyable trace command
pub const OPEN_TRACE_COMMAND: &str = "Open Trace Command";
/// Attachment name for the extracted trace viewer instructions
pub const TRACE_VIEWER: &str = "Trace Viewer";
/// Attachment name for the multi-attempt summary
pub const ATTEMPT_SUMMARY: &str = "Attempt Summary";

/// Attachment name for one attempt's failure panel
#[must_use]
pub fn failure_panel_name(attempt: u32) -> String {
    format!("Failure Panel (Attempt {attempt})")
}

/// Content type of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// PNG image
    Png,
    /// WebM video
    Webm,
    /// Zip archive
    Zip,
    /// HTML document
    Html,
    /// JSON document
    Json,
    /// Plain text
    Text,
}

impl AttachmentKind {
    /// File extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webm => "webm",
            Self::Zip => "zip",
            Self::Html => "html",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }

    /// MIME type
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Webm => "video/webm",
            Self::Zip => "application/zip",
            Self::Html => "text/html",
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }
}

/// Where attachment content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// File on disk, copied at publish time
    File(PathBuf),
    /// In-memory content
    Inline(Vec<u8>),
}

/// One named attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display name
    pub name: String,
    /// Content type
    pub kind: AttachmentKind,
    /// Content
    pub source: AttachmentSource,
}

impl Attachment {
    /// Attach a file by path
    #[must_use]
    pub fn file(name: impl Into<String>, kind: AttachmentKind, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: AttachmentSource::File(path.into()),
        }
    }

    /// Attach text content
    #[must_use]
    pub fn text(name: impl Into<String>, kind: AttachmentKind, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: AttachmentSource::Inline(body.into().into_bytes()),
        }
    }

    /// Attach raw bytes
    #[must_use]
    pub fn bytes(name: impl Into<String>, kind: AttachmentKind, body: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            source: AttachmentSource::Inline(body),
        }
    }

    /// Content as bytes
    pub fn read(&self) -> SwagResult<Vec<u8>> {
        match &self.source {
            AttachmentSource::File(path) => Ok(fs::read(path)?),
            AttachmentSource::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Final status of a test item across attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Passed on the first attempt
    Passed,
    /// Every attempt failed
    Failed,
    /// Failed at least once, then passed
    Flaky,
}

impl TestStatus {
    /// Check if the item eventually passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed | Self::Flaky)
    }

    /// Check if the item failed
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Attachment entry inside a result file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    /// Display name
    pub name: String,
    /// File name inside `report-results/`
    pub source: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime: String,
}

/// `<uuid>-result.json` contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFile {
    /// Result id
    pub uuid: String,
    /// Test name
    pub name: String,
    /// `module::Class::name`
    pub full_name: String,
    /// Final status
    pub status: TestStatus,
    /// Attempts executed
    pub attempts: u32,
    /// Completion time
    pub stop: DateTime<Utc>,
    /// Attachments in the order they were added
    pub attachments: Vec<AttachmentEntry>,
}

/// Writes result files for finished test items
#[derive(Debug, Clone)]
pub struct ResultSink {
    dir: PathBuf,
}

impl ResultSink {
    /// Sink writing into `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the result file and attachment files; returns the result file path.
    ///
    /// An attachment whose source file vanished is skipped with a warning.
    pub fn publish(
        &self,
        test: &TestId,
        status: TestStatus,
        attempts: u32,
        attachments: &[Attachment],
    ) -> SwagResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let mut entries = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let content = match attachment.read() {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(name = %attachment.name, error = %e, "attachment skipped");
                    continue;
                }
            };
            let source = format!("{}-attachment.{}", Uuid::new_v4(), attachment.kind.extension());
            fs::write(self.dir.join(&source), content)?;
            entries.push(AttachmentEntry {
                name: attachment.name.clone(),
                source,
                mime: attachment.kind.mime().to_string(),
            });
        }

        let uuid = Uuid::new_v4().to_string();
        let result = ResultFile {
            uuid: uuid.clone(),
            name: test.name.clone(),
            full_name: test.full_name(),
            status,
            attempts,
            stop: Utc::now(),
            attachments: entries,
        };
        let path = self.dir.join(format!("{uuid}-result.json"));
        fs::write(&path, serde_json::to_string_pretty(&result)?)?;
        tracing::debug!(test = %test, path = %path.display(), "result published");
        Ok(path)
    }
}
