//! Attempt diff: fields whose value changed across attempts.
//!
//! A section is emitted only when its field takes more than one distinct
//! value. Values keep first-appearance order so output is stable.

use super::assets;
use super::template::{render, Values};
use crate::ledger::AttemptRecord;
use crate::result::SwagResult;
use std::time::Duration;

/// Placeholder for a missing value
pub const MISSING: &str = "-";

/// One changed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSection {
    /// Section heading
    pub summary: &'static str,
    /// Distinct values, first appearance first
    pub values: Vec<String>,
}

/// Format a duration the way cards and diffs show it
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

fn distinct<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn text_or_missing(value: Option<&str>) -> String {
    value.unwrap_or(MISSING).to_string()
}

/// Changed fields across `records`
#[must_use]
pub fn compute_diff(records: &[AttemptRecord]) -> Vec<DiffSection> {
    let mut sections = Vec::new();
    let mut push = |summary: &'static str, values: Vec<String>| {
        if values.len() > 1 {
            sections.push(DiffSection { summary, values });
        }
    };

    push(
        "🛑 Error Differences",
        distinct(records.iter().map(|r| text_or_missing(r.error.as_deref()))),
    );
    push(
        "🌍 URL Differences",
        distinct(records.iter().map(|r| text_or_missing(r.url.as_deref()))),
    );
    push(
        "🕣 Duration Differences",
        distinct(records.iter().map(|r| format_duration(r.duration))),
    );

    let flags: [(&str, fn(&AttemptRecord) -> bool); 3] = [
        ("has_screenshot", |r| r.artifacts.screenshot),
        ("has_video", |r| r.artifacts.video),
        ("has_trace", |r| r.artifacts.trace),
    ];
    let attachment_lines: Vec<String> = flags
        .iter()
        .filter_map(|(name, get)| {
            let values = distinct(records.iter().map(|r| get(r).to_string()));
            (values.len() > 1).then(|| format!("{name} difference: {}", values.join(", ")))
        })
        .collect();
    if !attachment_lines.is_empty() {
        sections.push(DiffSection {
            summary: "📎 Attachment Differences",
            values: attachment_lines,
        });
    }
    sections
}

/// Diff view, or nothing when every field is stable
pub fn render_diff(records: &[AttemptRecord]) -> SwagResult<String> {
    let sections = compute_diff(records);
    if sections.is_empty() {
        return Ok(String::new());
    }
    let mut blocks = String::new();
    for section in &sections {
        blocks.push_str(&render(
            "diff",
            assets::DIFF,
            &Values::new()
                .text("summary", section.summary)
                .text("content", section.values.join("\n")),
        )?);
    }
    render("diff_view", assets::DIFF_VIEW, &Values::new().markup("sections", blocks))
}
