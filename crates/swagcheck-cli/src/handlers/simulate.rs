//! Simulate command handler
//!
//! Runs the flaky cart scenario end to end against the simulated shop: one
//! session, retries, evidence capture, attempt summary and result file.

use crate::commands::SimulateArgs;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use std::path::PathBuf;
use swagcheck::driver::simulated::SimulatedEngine;
use swagcheck::{
    scenario, Credentials, RetryRunner, RunLayout, Session, SuiteConfig, TestId, TestOutcome,
    TestStatus,
};

/// Where `--save-ledger` writes the ledger of `test`
#[must_use]
pub fn ledger_path(layout: &RunLayout, test: &TestId) -> PathBuf {
    layout
        .report_results()
        .join(format!("{}-ledger.json", test.full_name().replace("::", ".")))
}

/// Run the cart scenario with `fail_attempts` failing attempts
pub fn simulate(suite: SuiteConfig, fail_attempts: u32) -> CliResult<TestOutcome> {
    let engine = SimulatedEngine::new(scenario::shop_site(&suite.base_url, Credentials::default()));
    let mut session = Session::start(&engine, suite)?;
    let outcome = RetryRunner::new().run(
        &mut session,
        scenario::cart_badge_item(),
        scenario::flaky_cart_body(fail_attempts),
    );
    session.end()?;
    Ok(outcome?)
}

/// Run the scenario and report where its output landed
pub fn execute_simulate(printer: &Printer, suite: SuiteConfig, args: &SimulateArgs) -> CliResult<()> {
    let mut suite = match &args.root {
        Some(root) => suite.with_root(root),
        None => suite,
    };
    if let Some(retries) = args.max_retries {
        suite = suite.with_max_retries(retries);
    }
    let layout = suite.layout();
    tracing::debug!(
        root = %layout.root().display(),
        fail_attempts = args.fail_attempts,
        max_attempts = suite.max_attempts(),
        "simulating cart scenario"
    );
    let outcome = simulate(suite, args.fail_attempts)?;

    for record in outcome.ledger.records() {
        let line = format!(
            "attempt {} {} in {:.2}s",
            record.attempt,
            record.status.label(),
            record.duration.as_secs_f64()
        );
        match &record.error {
            Some(error) => printer.warning(&format!("{line}: {error}")),
            None => printer.info(&line),
        }
    }
    if let Some(path) = &outcome.result_file {
        printer.info(&format!("result file: {}", path.display()));
    }
    if args.save_ledger {
        let path = ledger_path(&layout, &outcome.id);
        outcome.ledger.save(&path)?;
        printer.info(&format!("ledger: {}", path.display()));
    }

    report_status(printer, &outcome.id, outcome.status, outcome.attempts())
}

fn report_status(printer: &Printer, test: &TestId, status: TestStatus, attempts: usize) -> CliResult<()> {
    match status {
        TestStatus::Passed => {
            printer.success(&format!("{test} passed"));
            Ok(())
        }
        TestStatus::Flaky => {
            printer.warning(&format!("{test} flaky: passed after {attempts} attempts"));
            Ok(())
        }
        TestStatus::Failed => {
            let message = format!("{test} failed after {attempts} attempts");
            printer.failure(&message);
            Err(CliError::test_failed(message))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ColorChoice, Verbosity};
    use std::path::Path;

    fn quiet() -> Printer {
        Printer::new(
            &CliConfig::new()
                .with_verbosity(Verbosity::Quiet)
                .with_color(ColorChoice::Never),
        )
    }

    fn has_result_file(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().filter_map(Result::ok).any(|e| {
            e.file_name().to_string_lossy().ends_with("-result.json")
        })
    }

    fn args(root: &Path, fail_attempts: u32, max_retries: Option<u32>) -> SimulateArgs {
        SimulateArgs {
            root: Some(root.to_path_buf()),
            fail_attempts,
            max_retries,
            save_ledger: true,
        }
    }

    #[test]
    fn test_flaky_run_succeeds_and_saves_ledger() {
        let dir = tempfile::tempdir().unwrap();
        execute_simulate(&quiet(), SuiteConfig::default(), &args(dir.path(), 1, None)).unwrap();

        let layout = RunLayout::new(dir.path());
        assert!(has_result_file(&layout.report_results()));
        let path = ledger_path(&layout, scenario::cart_badge_item().id());
        let ledger = swagcheck::AttemptLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_exhausted_retries_fail() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute_simulate(&quiet(), SuiteConfig::default(), &args(dir.path(), 5, Some(2)))
            .unwrap_err();
        assert!(matches!(err, CliError::TestFailed { .. }));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_ledger_path_flattens_name() {
        let layout = RunLayout::new("/run");
        let id = TestId::new("test_cart", "test_badge").with_class("TestCart");
        assert_eq!(
            ledger_path(&layout, &id),
            PathBuf::from("/run/report-results/test_cart.TestCart.test_badge-ledger.json")
        );
    }
}
