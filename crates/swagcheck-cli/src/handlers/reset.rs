//! Reset command handler

use crate::commands::ResetArgs;
use crate::error::CliResult;
use crate::output::Printer;
use swagcheck::SuiteConfig;

/// Delete and recreate every managed run directory
pub fn execute_reset(printer: &Printer, suite: SuiteConfig, args: &ResetArgs) -> CliResult<()> {
    let suite = match &args.root {
        Some(root) => suite.with_root(root),
        None => suite,
    };
    let layout = suite.layout();
    layout.reset_workspace()?;
    for dir in layout.managed_dirs() {
        printer.info(&format!("ready: {}", dir.display()));
    }
    printer.success(&format!("workspace reset at {}", layout.root().display()));
    Ok(())
}
