//! Login-state bootstrapper.
//!
//! Logs in once with known-good credentials and persists the context's
//! storage state so tests marked `need_login` start authenticated.

use crate::config::SuiteConfig;
use crate::driver::{Browser, BrowserContext, ContextOptions, StorageState};
use crate::page_object::LoginPage;
use crate::result::{SwagError, SwagResult};
use std::path::{Path, PathBuf};

/// Produces `storage/login.json`
#[derive(Debug, Clone)]
pub struct LoginStateBootstrapper {
    login_url: String,
    success_pattern: String,
    username: String,
    password: String,
    timeout: std::time::Duration,
    target: PathBuf,
}

impl LoginStateBootstrapper {
    /// Bootstrapper driven by `config`
    #[must_use]
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            login_url: config.login_url(),
            success_pattern: config.success_url_pattern.clone(),
            username: config.credentials.username.clone(),
            password: config.credentials.password.clone(),
            timeout: config.navigation_timeout(),
            target: config.layout().login_state(),
        }
    }

    /// Override the output path
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = target.into();
        self
    }

    /// Output path
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Log in with a fresh context of `browser` and save its storage state.
    ///
    /// The context is closed whether or not the login succeeded.
    pub fn bootstrap(&self, browser: &mut dyn Browser) -> SwagResult<PathBuf> {
        let mut context = browser.new_context(&ContextOptions::new())?;
        let result = self.login_and_save(context.as_mut());
        let closed = context.close();
        result?;
        closed?;
        validate_login_state(&self.target)?;
        tracing::info!(path = %self.target.display(), "login state saved");
        Ok(self.target.clone())
    }

    fn login_and_save(&self, context: &mut dyn BrowserContext) -> SwagResult<()> {
        let mut page = context.new_page()?;
        let login = LoginPage::new(self.login_url.clone(), &self.success_pattern)?
            .with_timeout(self.timeout);
        login.open(page.as_mut())?;
        login.login(page.as_mut(), &self.username, &self.password)?;
        login
            .verify_login_success(page.as_mut())
            .map_err(|e| SwagError::LoginState {
                message: format!("login as {} did not succeed: {e}", self.username),
            })?;
        context.save_storage_state(&self.target)?;
        page.close()
    }
}

/// Fail unless `path` parses as a storage state holding at least one cookie or origin
pub fn validate_login_state(path: &Path) -> SwagResult<()> {
    let missing = |why: &str| SwagError::LoginState {
        message: format!("{} {why}", path.display()),
    };
    let meta = std::fs::metadata(path).map_err(|_| missing("does not exist"))?;
    if meta.len() == 0 {
        return Err(missing("is empty"));
    }
    let state = StorageState::load(path).map_err(|e| missing(&format!("is unreadable: {e}")))?;
    if state.is_empty() {
        return Err(missing("holds no cookies or storage"));
    }
    Ok(())
}

/// Whether `path` already holds a usable login state
#[must_use]
pub fn has_login_state(path: &Path) -> bool {
    validate_login_state(path).is_ok()
}
