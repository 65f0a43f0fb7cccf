//! Failure panel and trace helper documents.
//!
//! The panel shows the evidence of one failed attempt: page URL, console
//! errors, the inline screenshot, and copyable commands that open the
//! attempt's trace in a viewer.

use super::assets;
use super::template::{render, Values};
use super::{ReportDocument, ReportOptions};
use crate::artifacts::TRACE_FILE;
use crate::ledger::AttemptRecord;
use crate::result::SwagResult;
use std::path::{Component, Path, PathBuf};

/// Port the extracted trace viewer is served on
pub const VIEWER_PORT: u16 = 9323;

/// Commands opening one trace from the run root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceCommands {
    /// Windows PowerShell
    pub powershell: String,
    /// Windows CMD
    pub cmd: String,
    /// macOS / Linux shells
    pub unix: String,
}

impl TraceCommands {
    /// Commands for `trace`, relative to `options.root` when it lies inside
    #[must_use]
    pub fn new(trace: &Path, options: &ReportOptions) -> Self {
        let root = absolute(&options.root);
        let canonical = absolute(trace);
        let rel = trace
            .strip_prefix(&options.root)
            .or_else(|_| canonical.strip_prefix(&root))
            .unwrap_or(&canonical);
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let (posix, windows) = if rel.is_absolute() {
            (rel.display().to_string(), rel.display().to_string())
        } else {
            (parts.join("/"), parts.join("\\"))
        };
        let root = root.display();
        let command = &options.trace_viewer_command;
        Self {
            powershell: format!("cd {root}; {command} {posix}"),
            cmd: format!("cd /d {root} && {command} {windows}"),
            unix: format!("cd {root} && {command} {posix}"),
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Anchor for web URLs; anything else is shown as plain text
fn url_link(url: &str) -> String {
    let escaped = super::template::escape_html(url);
    let lower = url.trim_start().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        format!(r#"<a href="{escaped}">{escaped}</a>"#)
    } else {
        escaped
    }
}

fn trace_block(attempt: u32, trace: &Path, options: &ReportOptions) -> SwagResult<String> {
    let commands = TraceCommands::new(trace, options);
    render(
        "trace_block",
        assets::TRACE_BLOCK,
        &Values::new()
            .text("aid", attempt.to_string())
            .text("powershell", commands.powershell)
            .text("cmd", commands.cmd)
            .text("unix", commands.unix),
    )
}

/// Failure panel fragment for `record`; `visible` controls its initial display
pub fn render_failure_panel(
    record: &AttemptRecord,
    options: &ReportOptions,
    visible: bool,
) -> SwagResult<String> {
    let evidence = record.evidence.clone().unwrap_or_default();
    let url = evidence
        .url
        .clone()
        .or_else(|| record.url.clone())
        .unwrap_or_else(|| "-".to_string());
    let console = evidence
        .console_json
        .clone()
        .unwrap_or_else(|| "[]".to_string());
    let screenshot = match evidence.screenshot_data_uri() {
        Some(uri) => format!(
            r#"<img src="{uri}" alt="Failure screenshot (attempt {})">"#,
            record.attempt
        ),
        None => r#"<p class="muted">No screenshot captured</p>"#.to_string(),
    };
    let video_note = if record.artifacts.video {
        "Recorded, attached to the report as Video"
    } else {
        "No video recorded (the CDP engine does not capture video; the trace keeps per-step screenshots)"
    };
    let trace = match (&record.artifact_dir, record.artifacts.trace) {
        (Some(dir), true) => trace_block(record.attempt, &dir.join(TRACE_FILE), options)?,
        _ => r#"<p class="muted">No trace recorded</p>"#.to_string(),
    };

    render(
        "failure_panel",
        assets::FAILURE_PANEL,
        &Values::new()
            .text("aid", record.attempt.to_string())
            .text("display", if visible { "block" } else { "none" })
            .markup("url_link", url_link(&url))
            .text("console", console)
            .markup("screenshot", screenshot)
            .text("video_note", video_note)
            .markup("trace_block", trace),
    )
}

fn standalone(title: String, body: String) -> SwagResult<ReportDocument> {
    let html = render(
        "standalone",
        assets::STANDALONE,
        &Values::new()
            .text("title", title.clone())
            .markup("css", assets::CSS)
            .markup("body", body)
            .markup("script", assets::SCRIPT),
    )?;
    Ok(ReportDocument { title, html })
}

/// Standalone document holding the failure panel of `record`
pub fn render_failure_panel_document(
    record: &AttemptRecord,
    options: &ReportOptions,
) -> SwagResult<ReportDocument> {
    standalone(
        format!("Failure Panel (Attempt {})", record.attempt),
        render_failure_panel(record, options, true)?,
    )
}

/// Standalone document with copyable commands opening `trace`
pub fn render_trace_command_document(
    trace: &Path,
    options: &ReportOptions,
) -> SwagResult<ReportDocument> {
    let attempt = trace
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("attempt_"))
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0);
    let body = render(
        "trace_command",
        assets::TRACE_COMMAND,
        &Values::new().markup("trace_block", trace_block(attempt, trace, options)?),
    )?;
    standalone("Open Trace".to_string(), body)
}

/// Standalone document explaining how to serve an extracted trace viewer
pub fn render_trace_viewer_document(viewer_dir: &Path) -> SwagResult<ReportDocument> {
    let dir = absolute(viewer_dir);
    let body = render(
        "trace_viewer",
        assets::TRACE_VIEWER,
        &Values::new()
            .text(
                "serve",
                format!("cd {} && python -m http.server {VIEWER_PORT}", dir.display()),
            )
            .text("port", VIEWER_PORT.to_string()),
    )?;
    standalone("Trace Viewer".to_string(), body)
}
