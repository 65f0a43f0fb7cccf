//! Session lifecycle.
//!
//! One session per run: reset the workspace, launch one browser, make sure a
//! login state exists. Every attempt of every test borrows the session's
//! browser and console registry.

use crate::artifacts::RunLayout;
use crate::config::SuiteConfig;
use crate::driver::{Browser, BrowserEngine};
use crate::evidence::ConsoleRegistry;
use crate::login::{has_login_state, validate_login_state, LoginStateBootstrapper};
use crate::result::SwagResult;

/// A running session
pub struct Session {
    config: SuiteConfig,
    layout: RunLayout,
    browser: Box<dyn Browser>,
    consoles: ConsoleRegistry,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.layout.root())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Reset the workspace, launch the browser and ensure login state.
    ///
    /// Every error here is fatal for the run.
    pub fn start(engine: &dyn BrowserEngine, config: SuiteConfig) -> SwagResult<Self> {
        config.validate()?;
        let layout = config.layout();
        layout.reset_workspace()?;

        let browser = engine.launch(&config.launch_options())?;
        tracing::info!(engine = engine.name(), headless = config.headless, "browser launched");

        let mut session = Self {
            config,
            layout,
            browser,
            consoles: ConsoleRegistry::new(),
            closed: false,
        };
        if let Err(e) = session.ensure_login_state() {
            if let Err(close) = session.end() {
                tracing::warn!(error = %close, "browser close failed after login failure");
            }
            return Err(e);
        }
        Ok(session)
    }

    /// Bootstrap the login state if it is missing or empty, then re-validate
    pub fn ensure_login_state(&mut self) -> SwagResult<()> {
        let path = self.layout.login_state();
        if has_login_state(&path) {
            return Ok(());
        }
        tracing::info!(path = %path.display(), "login state missing, bootstrapping");
        LoginStateBootstrapper::from_config(&self.config)
            .with_target(&path)
            .bootstrap(self.browser.as_mut())?;
        validate_login_state(&path)
    }

    /// Suite configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run layout
    #[must_use]
    pub const fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Shared console registry
    #[must_use]
    pub const fn consoles(&self) -> &ConsoleRegistry {
        &self.consoles
    }

    /// The session browser
    pub fn browser(&mut self) -> &mut dyn Browser {
        self.browser.as_mut()
    }

    /// Close the browser
    pub fn end(&mut self) -> SwagResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.browser.close()?;
        tracing::info!("session ended");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.end() {
                tracing::warn!(error = %e, "browser close failed during drop");
            }
        }
    }
}
