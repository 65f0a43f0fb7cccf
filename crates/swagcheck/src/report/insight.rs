//! Retry insight: short heuristics about how the attempts differ.

use super::assets;
use super::template::{escape_html, render, Values};
use crate::ledger::AttemptRecord;
use crate::result::SwagResult;
use std::collections::BTreeSet;

/// Insight lines for `records`, in display order
#[must_use]
pub fn retry_insight(records: &[AttemptRecord]) -> Vec<String> {
    let failed: Vec<&AttemptRecord> = records.iter().filter(|r| r.is_failed()).collect();
    let passed = records.len() - failed.len();
    let mut lines = Vec::new();

    if !failed.is_empty() && passed > 0 {
        lines.push(format!("Failed {} times, then passed on retry", failed.len()));
        lines.push("Likely flaky test (unstable behavior)".to_string());
    } else if !records.is_empty() && passed == 0 {
        lines.push(format!("All {} attempts failed", records.len()));
    }

    let errors: BTreeSet<&str> = failed
        .iter()
        .filter_map(|r| r.error.as_deref())
        .filter(|e| !e.is_empty())
        .collect();
    match errors.len() {
        0 => {}
        1 => lines.push("Same error across failed attempts".to_string()),
        _ => lines.push("Error message changed between attempts".to_string()),
    }

    let urls: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.url.as_deref())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.len() > 1 {
        lines.push("Failed at different URLs".to_string());
    }
    lines
}

/// Insight block, or nothing when there is nothing to say
pub fn render_insight(records: &[AttemptRecord]) -> SwagResult<String> {
    let lines = retry_insight(records);
    if lines.is_empty() {
        return Ok(String::new());
    }
    let items: String = lines
        .iter()
        .map(|line| format!("<li>{}</li>", escape_html(line)))
        .collect();
    render("insight", assets::INSIGHT, &Values::new().markup("items", items))
}
