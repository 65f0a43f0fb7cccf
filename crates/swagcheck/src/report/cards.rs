//! Attempt tabs and cards.
//!
//! Exactly one tab/card pair is active: the last attempt's.

use super::assets;
use super::diff::{format_duration, MISSING};
use super::failure_panel::render_failure_panel;
use super::template::{render, Values};
use super::ReportOptions;
use crate::ledger::{AttemptRecord, AttemptStatus};
use crate::result::SwagResult;

fn presence(flag: bool) -> &'static str {
    if flag {
        "✔️"
    } else {
        "❌"
    }
}

fn status_text(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Passed => "✔ PASSED",
        AttemptStatus::Failed => "❌ FAILED",
    }
}

fn active_class(record: &AttemptRecord, active: u32) -> &'static str {
    if record.attempt == active {
        "active"
    } else {
        ""
    }
}

/// Tab buttons for `records`, with `active` highlighted
pub fn render_tabs(records: &[AttemptRecord], active: u32) -> SwagResult<String> {
    let mut html = String::new();
    for record in records {
        html.push_str(&render(
            "tab",
            assets::TAB,
            &Values::new()
                .text("active", active_class(record, active))
                .text("aid", record.attempt.to_string())
                .text("icon", record.status.icon()),
        )?);
    }
    Ok(html)
}

/// One card; failed attempts embed their hidden failure panel
pub fn render_card(record: &AttemptRecord, active: u32, options: &ReportOptions) -> SwagResult<String> {
    let (button, panel) = if record.is_failed() {
        (
            render(
                "panel_button",
                assets::PANEL_BUTTON,
                &Values::new().text("aid", record.attempt.to_string()),
            )?,
            render_failure_panel(record, options, false)?,
        )
    } else {
        (String::new(), String::new())
    };
    render(
        "card",
        assets::CARD,
        &Values::new()
            .text("active", active_class(record, active))
            .text("aid", record.attempt.to_string())
            .text("status", status_text(record.status))
            .text("duration", format_duration(record.duration))
            .text("error", record.error.as_deref().unwrap_or(MISSING))
            .text("url", record.url.as_deref().unwrap_or(MISSING))
            .text("screenshot", presence(record.artifacts.screenshot))
            .text("video", presence(record.artifacts.video))
            .text("trace", presence(record.artifacts.trace))
            .markup("panel_button", button)
            .markup("failure_panel", panel),
    )
}

/// All cards, in attempt order
pub fn render_cards(records: &[AttemptRecord], active: u32, options: &ReportOptions) -> SwagResult<String> {
    records
        .iter()
        .map(|record| render_card(record, active, options))
        .collect::<SwagResult<Vec<_>>>()
        .map(|cards| cards.concat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    fn options() -> ReportOptions {
        ReportOptions::new(Path::new("."))
    }

    #[test]
    fn test_only_last_tab_active() {
        let records = [
            AttemptRecord::failed(1, Duration::from_secs(1), "boom"),
            AttemptRecord::passed(2, Duration::from_secs(1)),
        ];
        let tabs = render_tabs(&records, 2).unwrap();
        assert_eq!(tabs.matches(r#"class="tab active""#).count(), 1);
        assert!(tabs.contains(r#"class="tab active" id="tab-2""#));
        assert!(tabs.contains("Attempt 1 ❌"));
    }

    #[test]
    fn test_failed_card_has_button_and_hidden_panel() {
        let record = AttemptRecord::failed(1, Duration::from_millis(2500), "AssertionError: 2 != 3")
            .with_url("https://shop.test/cart.html");
        let html = render_card(&record, 2, &options()).unwrap();
        assert!(html.contains(r#"<div class="card " id="attempt-1">"#));
        assert!(html.contains("❌ FAILED"));
        assert!(html.contains("2.50s"));
        assert!(html.contains("AssertionError: 2 != 3"));
        assert!(html.contains("togglePanel(1);return false;"));
        assert!(html.contains("🖲️ View Failure Panel (Attempt 1)"));
        assert!(html.contains(r#"id="panel-1" style="display:none""#));
    }

    #[test]
    fn test_passed_card_defaults() {
        let record = AttemptRecord::passed(2, Duration::from_secs(1));
        let html = render_card(&record, 2, &options()).unwrap();
        assert!(html.contains(r#"<div class="card active" id="attempt-2">"#));
        assert!(html.contains("✔ PASSED"));
        assert!(html.contains("<pre>-</pre>"));
        assert!(!html.contains("panel-btn"));
        assert!(!html.contains("failure-panel"));
        assert_eq!(html.matches("❌").count(), 3);
    }
}
