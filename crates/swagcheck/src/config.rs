//! Suite configuration.
//!
//! Loaded from YAML (`swagcheck.yaml`) with environment overrides, then
//! adjusted with `with_*` builders.

use crate::artifacts::RunLayout;
use crate::driver::LaunchOptions;
use crate::result::{SwagError, SwagResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable forcing headless mode when set (any value but "" / "0" / "false")
pub const ENV_CI: &str = "CI";
/// Environment variable overriding the application base URL
pub const ENV_BASE_URL: &str = "SWAGCHECK_BASE_URL";
/// Environment variable overriding the retry budget
pub const ENV_MAX_RETRIES: &str = "SWAGCHECK_MAX_RETRIES";
/// Environment variable overriding the run root
pub const ENV_ROOT: &str = "SWAGCHECK_ROOT";

/// Username/password pair used by the login bootstrapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "standard_user".to_string(),
            password: "secret_sauce".to_string(),
        }
    }
}

/// Video recording dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for VideoSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Configuration for one test session run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Run root; every output directory is created below it
    pub root: PathBuf,
    /// Application base URL
    pub base_url: String,
    /// Path of the login page relative to `base_url`
    pub login_path: String,
    /// URL pattern (regex) reached after a successful login
    pub success_url_pattern: String,
    /// Known-good credentials for the login bootstrapper
    pub credentials: Credentials,
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Run the browser headless
    pub headless: bool,
    /// Video recording size
    pub video_size: VideoSize,
    /// Command that opens a trace archive, followed by the archive path
    pub trace_viewer_command: String,
    /// Navigation / wait timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Browser binary; auto-detected when absent
    pub browser_executable: Option<PathBuf>,
    /// Launch the browser without its sandbox (containers)
    pub no_sandbox: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base_url: "https://www.saucedemo.com".to_string(),
            login_path: "/".to_string(),
            success_url_pattern: "/inventory.html".to_string(),
            credentials: Credentials::default(),
            max_retries: 1,
            headless: false,
            video_size: VideoSize::default(),
            trace_viewer_command: crate::report::DEFAULT_TRACE_VIEWER_COMMAND.to_string(),
            navigation_timeout_ms: 30_000,
            browser_executable: None,
            no_sandbox: false,
        }
    }
}

impl SuiteConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> SwagResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SwagError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = serde_yaml_ng::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, then apply process environment overrides
    pub fn resolve(path: Option<&Path>) -> SwagResult<Self> {
        let config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env_from<F>(mut self, lookup: F) -> SwagResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ci) = lookup(ENV_CI) {
            if !matches!(ci.trim(), "" | "0" | "false") {
                self.headless = true;
            }
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = retries.trim().parse().map_err(|_| SwagError::Config {
                message: format!("{ENV_MAX_RETRIES} must be a non-negative integer, got {retries:?}"),
            })?;
        }
        if let Some(root) = lookup(ENV_ROOT) {
            self.root = PathBuf::from(root);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check field consistency
    pub fn validate(&self) -> SwagResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SwagError::Config {
                message: "base_url must not be empty".to_string(),
            });
        }
        regex::Regex::new(&self.success_url_pattern).map_err(|e| SwagError::Config {
            message: format!("success_url_pattern is not a valid regex: {e}"),
        })?;
        if self.video_size.width == 0 || self.video_size.height == 0 {
            return Err(SwagError::Config {
                message: "video_size must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Set the run root
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the retry budget
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the login credentials
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Set the trace viewer command
    #[must_use]
    pub fn with_trace_viewer_command(mut self, command: impl Into<String>) -> Self {
        self.trace_viewer_command = command.into();
        self
    }

    /// Use a specific browser binary
    #[must_use]
    pub fn with_browser_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.browser_executable = Some(path.into());
        self
    }

    /// Launch without the browser sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }

    /// Launch options for the session browser
    #[must_use]
    pub fn launch_options(&self) -> LaunchOptions {
        let mut options = LaunchOptions::default().with_headless(self.headless);
        if let Some(path) = &self.browser_executable {
            options = options.with_executable(path);
        }
        if self.no_sandbox {
            options = options.with_no_sandbox();
        }
        options
    }

    /// Total attempts a test item may use
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Absolute login URL
    #[must_use]
    pub fn login_url(&self) -> String {
        join_url(&self.base_url, &self.login_path)
    }

    /// Resolve a path of the application under test
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Navigation timeout
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Directory layout for this run
    #[must_use]
    pub fn layout(&self) -> RunLayout {
        RunLayout::new(&self.root)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> SwagResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
