//! Report command handler

use crate::commands::ReportArgs;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use std::path::Path;
use swagcheck::{render_attempt_summary, AttemptLedger, ReportDocument, ReportOptions, SuiteConfig, TestId};

/// Load a saved ledger, reload each attempt's evidence, and render its summary
pub fn render_ledger(
    ledger_path: &Path,
    test: &TestId,
    options: &ReportOptions,
) -> CliResult<ReportDocument> {
    let mut ledger = AttemptLedger::load(ledger_path)?;
    ledger.reload_evidence()?;
    Ok(render_attempt_summary(test, &ledger, options)?)
}

/// Render the attempt summary of a saved ledger to a file or stdout
pub fn execute_report(printer: &Printer, suite: &SuiteConfig, args: &ReportArgs) -> CliResult<()> {
    let test: TestId = args
        .test
        .parse()
        .map_err(|e| CliError::invalid_argument(format!("--test: {e}")))?;
    let document = render_ledger(&args.ledger, &test, &ReportOptions::from_config(suite))?;

    match &args.out {
        Some(out) => {
            if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(out, &document.html)?;
            printer.success(&format!("{} written to {}", document.title, out.display()));
        }
        None => printer.raw(&document.html),
    }
    Ok(())
}
