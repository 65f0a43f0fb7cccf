//! Attempt chain: one line showing how the attempts went.
//!
//! Uniform outcomes collapse to a muted one-liner; mixed outcomes render one
//! badge per attempt joined by arrows.

use super::assets;
use super::template::{render, Values};
use crate::ledger::AttemptRecord;
use crate::result::SwagResult;

const ARROW: &str = r#"<span class="arrow">→</span>"#;

/// Render the chain for `records`
pub fn render_chain(records: &[AttemptRecord]) -> SwagResult<String> {
    let failures = records.iter().filter(|r| r.is_failed()).count();
    if failures == 0 {
        return Ok(r#"<div class="attempt-chain muted">🔁 Attempts: passed</div>"#.to_string());
    }
    if failures == records.len() {
        let noun = if failures == 1 { "failure" } else { "failures" };
        return Ok(format!(
            r#"<div class="attempt-chain muted">🔁 Attempts: {failures} {noun}</div>"#
        ));
    }
    let badges = records
        .iter()
        .map(badge)
        .collect::<SwagResult<Vec<_>>>()?
        .join(ARROW);
    render("chain", assets::CHAIN, &Values::new().markup("chain", badges))
}

fn badge(record: &AttemptRecord) -> SwagResult<String> {
    render(
        "badge",
        assets::BADGE,
        &Values::new()
            .text("status", record.status.label())
            .text("aid", record.attempt.to_string())
            .text("icon", record.status.icon()),
    )
}
