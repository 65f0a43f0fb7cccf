//! Trace archives.
//!
//! A trace is a zip holding:
//!
//! - `trace.json`: metadata plus ordered action events
//! - `resources/<n>.png`: per-action screenshots (when enabled)
//! - `index.html`: static timeline viewer
//!
//! [`extract_trace`] unpacks an archive next to itself into `trace-viewer/`.

use super::TraceOptions;
use crate::report::template::escape_html;
use crate::result::{SwagError, SwagResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Archive entry holding trace metadata and events
pub const TRACE_JSON: &str = "trace.json";
/// Archive entry holding the static viewer
pub const TRACE_INDEX: &str = "index.html";
/// Directory (next to the archive) that [`extract_trace`] writes
pub const VIEWER_DIR: &str = "trace-viewer";

/// One recorded action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Position in the trace, from 0
    pub index: usize,
    /// Wall-clock time of the action
    pub timestamp: DateTime<Utc>,
    /// Action name (`goto`, `fill`, `click`, ...)
    pub action: String,
    /// Action target (URL or selector)
    pub target: String,
    /// Page URL after the action
    pub url: String,
    /// Error text if the action failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Screenshot resource path inside the archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// `trace.json` contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceDocument {
    /// Trace name
    pub name: String,
    /// Options the trace was started with
    pub options: TraceOptions,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Stop time
    pub stopped_at: DateTime<Utc>,
    /// Ordered events
    pub events: Vec<TraceEvent>,
}

/// Collects actions between `start_tracing` and `stop_tracing`
#[derive(Debug)]
pub struct TraceRecorder {
    options: TraceOptions,
    started_at: DateTime<Utc>,
    events: Vec<TraceEvent>,
    resources: Vec<(String, Vec<u8>)>,
}

impl TraceRecorder {
    /// Start recording
    #[must_use]
    pub fn start(options: TraceOptions) -> Self {
        Self {
            options,
            started_at: Utc::now(),
            events: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Trace options
    #[must_use]
    pub const fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Recorded events
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Record an action; `screenshot` is kept only when screenshots are enabled
    pub fn record(
        &mut self,
        action: &str,
        target: &str,
        url: &str,
        error: Option<String>,
        screenshot: Option<Vec<u8>>,
    ) {
        let index = self.events.len();
        let screenshot = match screenshot {
            Some(bytes) if self.options.screenshots => {
                let name = format!("resources/{index}.png");
                self.resources.push((name.clone(), bytes));
                Some(name)
            }
            _ => None,
        };
        self.events.push(TraceEvent {
            index,
            timestamp: Utc::now(),
            action: action.to_string(),
            target: target.to_string(),
            url: url.to_string(),
            error,
            screenshot,
        });
    }

    /// Finish and write the archive to `path`
    pub fn finish(self, path: &Path) -> SwagResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let document = TraceDocument {
            name: self.options.name.clone(),
            options: self.options,
            started_at: self.started_at,
            stopped_at: Utc::now(),
            events: self.events,
        };

        let mut zip = zip::ZipWriter::new(File::create(path)?);
        let options = SimpleFileOptions::default();

        zip.start_file(TRACE_JSON, options)?;
        zip.write_all(serde_json::to_string_pretty(&document)?.as_bytes())?;

        for (name, bytes) in &self.resources {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        zip.start_file(TRACE_INDEX, options)?;
        zip.write_all(render_viewer(&document).as_bytes())?;

        zip.finish()?;
        Ok(())
    }
}

fn render_viewer(document: &TraceDocument) -> String {
    let mut rows = String::new();
    for event in &document.events {
        let shot = event
            .screenshot
            .as_deref()
            .map(|src| format!("<img src=\"{}\" width=\"320\">", escape_html(src)))
            .unwrap_or_default();
        let error = event
            .error
            .as_deref()
            .map(|e| format!("<div class=\"error\">{}</div>", escape_html(e)))
            .unwrap_or_default();
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}{}</td></tr>\n",
            event.timestamp.format("%H:%M:%S%.3f"),
            escape_html(&event.action),
            escape_html(&event.target),
            escape_html(&event.url),
            error,
            shot,
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Trace {name}</title>\
         <style>body{{font-family:sans-serif}}td{{padding:4px 8px;vertical-align:top}}\
         .error{{color:#c0392b}}</style></head>\n<body><h1>Trace {name}</h1>\n\
         <table><tr><th>Time</th><th>Action</th><th>Target</th><th>URL</th><th></th></tr>\n\
         {rows}</table></body></html>\n",
        name = escape_html(&document.name),
    )
}

/// Read `trace.json` from an archive
pub fn read_trace(path: &Path) -> SwagResult<TraceDocument> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut entry = archive.by_name(TRACE_JSON)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(serde_json::from_str(&text)?)
}

/// Unpack `trace_zip` into `<zip dir>/trace-viewer/`, replacing any earlier extraction.
///
/// Returns the extraction directory.
pub fn extract_trace(trace_zip: &Path) -> SwagResult<PathBuf> {
    let parent = trace_zip.parent().unwrap_or_else(|| Path::new("."));
    let target = parent.join(VIEWER_DIR);
    crate::artifacts::remove_dir_if_exists(&target)?;
    fs::create_dir_all(&target)?;

    let mut archive = zip::ZipArchive::new(File::open(trace_zip)?)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(SwagError::tracing(format!(
                "unsafe entry in trace archive: {}",
                entry.name()
            )));
        };
        let out = target.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = File::create(&out)?;
        std::io::copy(&mut entry, &mut file)?;
    }
    tracing::debug!(dir = %target.display(), "trace extracted");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(screenshots: bool) -> TraceRecorder {
        let mut options = TraceOptions::full("attempt_1");
        options.screenshots = screenshots;
        TraceRecorder::start(options)
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracing/attempt_1/trace.zip");
        let mut rec = recorder(true);
        rec.record("goto", "https://shop.test/", "https://shop.test/", None, Some(vec![1, 2, 3]));
        rec.record(
            "click",
            "[data-test='login-button']",
            "https://shop.test/",
            Some("no such element".into()),
            None,
        );
        rec.finish(&path).unwrap();

        let doc = read_trace(&path).unwrap();
        assert_eq!(doc.name, "attempt_1");
        assert_eq!(doc.events.len(), 2);
        assert_eq!(doc.events[0].screenshot.as_deref(), Some("resources/0.png"));
        assert_eq!(doc.events[1].error.as_deref(), Some("no such element"));
        assert!(doc.stopped_at >= doc.started_at);
    }

    #[test]
    fn test_screenshots_disabled_drops_resources() {
        let mut rec = recorder(false);
        rec.record("goto", "u", "u", None, Some(vec![0]));
        assert!(rec.events()[0].screenshot.is_none());
    }

    #[test]
    fn test_extract_into_viewer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.zip");
        let mut rec = recorder(true);
        rec.record("goto", "<x>", "https://shop.test/", None, Some(vec![9]));
        rec.finish(&path).unwrap();

        let out = extract_trace(&path).unwrap();
        assert_eq!(out, dir.path().join("trace-viewer"));
        assert!(out.join(TRACE_JSON).is_file());
        assert_eq!(fs::read(out.join("resources/0.png")).unwrap(), vec![9]);
        let index = fs::read_to_string(out.join(TRACE_INDEX)).unwrap();
        assert!(index.contains("&lt;x&gt;"));

        // Re-extraction replaces the previous tree
        fs::write(out.join("stale.txt"), "x").unwrap();
        let out = extract_trace(&path).unwrap();
        assert!(!out.join("stale.txt").exists());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.zip");
        fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(extract_trace(&path), Err(SwagError::Archive(_))));
    }
}
