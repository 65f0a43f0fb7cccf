//! Login-state command handler

use crate::commands::LoginStateArgs;
use crate::error::CliResult;
use crate::output::Printer;
use swagcheck::driver::simulated::SimulatedEngine;
use swagcheck::driver::BrowserEngine;
use swagcheck::login::has_login_state;
use swagcheck::{scenario, Credentials, LoginStateBootstrapper, SuiteConfig};

/// Log in once and save `storage/login.json` under the run root
pub fn execute_login_state(
    printer: &Printer,
    suite: SuiteConfig,
    args: &LoginStateArgs,
) -> CliResult<()> {
    let suite = resolve_suite(suite, args);
    suite.validate()?;
    let target = suite.layout().login_state();
    if !args.force && has_login_state(&target) {
        printer.info(&format!("login state already present: {}", target.display()));
        return Ok(());
    }

    let engine = engine_for(&suite, args.simulated)?;
    tracing::debug!(engine = engine.name(), target = %target.display(), "bootstrapping login state");
    let mut browser = engine.launch(&suite.launch_options())?;
    let result = LoginStateBootstrapper::from_config(&suite).bootstrap(browser.as_mut());
    let closed = browser.close();
    let path = result?;
    closed?;

    printer.success(&format!("login state saved: {}", path.display()));
    Ok(())
}

/// Apply the command-line overrides to the suite configuration
fn resolve_suite(suite: SuiteConfig, args: &LoginStateArgs) -> SuiteConfig {
    let suite = match &args.root {
        Some(root) => suite.with_root(root),
        None => suite,
    };
    let suite = match &args.executable {
        Some(path) => suite.with_browser_executable(path),
        None => suite,
    };
    if args.no_sandbox {
        suite.with_no_sandbox(true)
    } else {
        suite
    }
}

/// The simulated shop only knows the standard account
fn engine_for(suite: &SuiteConfig, simulated: bool) -> CliResult<Box<dyn BrowserEngine>> {
    if simulated {
        return Ok(Box::new(SimulatedEngine::new(scenario::shop_site(
            &suite.base_url,
            Credentials::default(),
        ))));
    }
    browser_engine()
}

#[cfg(feature = "browser")]
fn browser_engine() -> CliResult<Box<dyn BrowserEngine>> {
    Ok(Box::new(swagcheck::CdpEngine::new()?))
}

#[cfg(not(feature = "browser"))]
fn browser_engine() -> CliResult<Box<dyn BrowserEngine>> {
    Err(crate::error::CliError::unsupported(
        "browser support not compiled in; rebuild with --features browser or pass --simulated",
    ))
}
