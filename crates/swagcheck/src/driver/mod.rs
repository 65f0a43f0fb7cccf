//! Browser driver contract.
//!
//! The pipeline talks to the automation engine only through these traits.
//! Two engines ship with the crate:
//!
//! - [`simulated::SimulatedEngine`]: deterministic in-process site, always available
//! - `cdp::CdpEngine`: Chrome `DevTools` Protocol via chromiumoxide (feature `browser`)
//!
//! ```text
//! BrowserEngine ──launch──► Browser ──new_context──► BrowserContext ──new_page──► Page
//!                              │                        │ start/stop tracing       │ goto/fill/click
//!                              │                        │ save_storage_state       │ screenshot
//!                              └─ close                 └─ close (flushes video)   └─ on_console
//! ```

#[cfg(feature = "browser")]
#[allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::redundant_clone
)]
pub mod cdp;
pub mod simulated;
pub mod trace;

use crate::config::VideoSize;
use crate::result::{SwagError, SwagResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser launch options
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Path to a browser binary (None = auto-detect)
    pub executable: Option<PathBuf>,
    /// Disable the sandbox (containers/CI)
    pub sandbox: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            sandbox: true,
        }
    }
}

impl LaunchOptions {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the browser binary
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Disable sandbox
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Options for a new isolated browser context
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Storage state file to preload (cookies, origins)
    pub storage_state: Option<PathBuf>,
    /// Directory receiving the video once the context closes
    pub record_video_dir: Option<PathBuf>,
    /// Video dimensions
    pub video_size: VideoSize,
    /// Let the page size follow the window instead of a fixed viewport
    pub no_viewport: bool,
}

impl ContextOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload storage state
    #[must_use]
    pub fn with_storage_state(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_state = Some(path.into());
        self
    }

    /// Record video into `dir`
    #[must_use]
    pub fn with_video(mut self, dir: impl Into<PathBuf>, size: VideoSize) -> Self {
        self.record_video_dir = Some(dir.into());
        self.video_size = size;
        self
    }

    /// Disable the fixed viewport
    #[must_use]
    pub const fn with_no_viewport(mut self) -> Self {
        self.no_viewport = true;
        self
    }
}

/// Options for a tracing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOptions {
    /// Trace name (`attempt_<N>`)
    pub name: String,
    /// Capture a screenshot after each action
    pub screenshots: bool,
    /// Capture DOM snapshots
    pub snapshots: bool,
    /// Record source locations
    pub sources: bool,
}

impl TraceOptions {
    /// Full capture under `name`
    #[must_use]
    pub fn full(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            screenshots: true,
            snapshots: true,
            sources: true,
        }
    }
}

/// Identity of one page, stable for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// Source location of a console message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLocation {
    /// Script URL
    pub url: String,
    /// Line number (0-based)
    #[serde(rename = "lineNumber")]
    pub line_number: u32,
    /// Column number (0-based)
    #[serde(rename = "columnNumber")]
    pub column_number: u32,
}

/// A message emitted on the page console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    /// Message type (`log`, `warning`, `error`, ...)
    pub kind: String,
    /// Message text
    pub text: String,
    /// Source location
    pub location: ConsoleLocation,
}

impl ConsoleMessage {
    /// Create a console message
    #[must_use]
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            location: ConsoleLocation::default(),
        }
    }

    /// Set the source location
    #[must_use]
    pub fn at(mut self, url: impl Into<String>, line: u32, column: u32) -> Self {
        self.location = ConsoleLocation {
            url: url.into(),
            line_number: line,
            column_number: column,
        };
        self
    }

    /// Whether this is an error-level message
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == "error"
    }
}

/// Console listener callback; engines may invoke it from another thread
pub type ConsoleListener = Box<dyn Fn(&ConsoleMessage) + Send + Sync>;

/// A cookie in storage-state format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain
    pub domain: String,
    /// Path
    pub path: String,
    /// Expiration (seconds since epoch, -1 = session)
    pub expires: f64,
    /// HTTP only flag
    pub http_only: bool,
    /// Secure flag
    pub secure: bool,
    /// Same-site policy (`Strict`, `Lax`, `None`)
    pub same_site: String,
}

impl Cookie {
    /// Create a session cookie
    #[must_use]
    pub fn new(name: &str, value: &str, domain: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            expires: -1.0,
            http_only: false,
            secure: false,
            same_site: "Lax".to_string(),
        }
    }
}

/// A local-storage entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    /// Key
    pub name: String,
    /// Value
    pub value: String,
}

/// Local storage of one origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    /// Origin, e.g. `https://www.saucedemo.com`
    pub origin: String,
    /// Local storage entries
    pub local_storage: Vec<StorageEntry>,
}

/// Authenticated session state persisted between contexts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    /// Cookies
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// Per-origin local storage
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

impl StorageState {
    /// Create empty storage state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Add a local-storage item
    #[must_use]
    pub fn with_local_storage(mut self, origin: &str, name: &str, value: &str) -> Self {
        let entry = StorageEntry {
            name: name.to_string(),
            value: value.to_string(),
        };
        if let Some(state) = self.origins.iter_mut().find(|o| o.origin == origin) {
            state.local_storage.push(entry);
        } else {
            self.origins.push(OriginState {
                origin: origin.to_string(),
                local_storage: vec![entry],
            });
        }
        self
    }

    /// Whether nothing would be restored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }

    /// Look up a cookie value by name
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Read a storage state file
    pub fn load(path: &Path) -> SwagResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write a storage state file (pretty JSON), creating parent directories
    pub fn save(&self, path: &Path) -> SwagResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Launches browsers
pub trait BrowserEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Launch one browser instance
    fn launch(&self, options: &LaunchOptions) -> SwagResult<Box<dyn Browser>>;
}

/// A launched browser, shared by every attempt of a session
pub trait Browser: Send {
    /// Open an isolated context
    fn new_context(&mut self, options: &ContextOptions) -> SwagResult<Box<dyn BrowserContext>>;

    /// Close the browser and every context still open
    fn close(&mut self) -> SwagResult<()>;
}

/// An isolated browser context (cookies, storage, video, tracing)
pub trait BrowserContext: Send {
    /// Open a page in this context
    fn new_page(&mut self) -> SwagResult<Box<dyn Page>>;

    /// Start recording a trace
    fn start_tracing(&mut self, options: &TraceOptions) -> SwagResult<()>;

    /// Stop recording and write the archive to `path`
    fn stop_tracing(&mut self, path: &Path) -> SwagResult<()>;

    /// Write the context's storage state to `path`
    fn save_storage_state(&mut self, path: &Path) -> SwagResult<()>;

    /// Close the context; video files are complete only after this returns
    fn close(&mut self) -> SwagResult<()>;
}

/// A page (tab)
pub trait Page: Send {
    /// Stable page identity
    fn id(&self) -> PageId;

    /// Navigate to `url`
    fn goto(&mut self, url: &str) -> SwagResult<()>;

    /// Current URL
    fn url(&self) -> SwagResult<String>;

    /// Fill an input matched by `selector`
    fn fill(&mut self, selector: &str, value: &str) -> SwagResult<()>;

    /// Click the element matched by `selector`
    fn click(&mut self, selector: &str) -> SwagResult<()>;

    /// Text content of the element matched by `selector`, if present
    fn text_content(&self, selector: &str) -> SwagResult<Option<String>>;

    /// Wait until the current URL matches `pattern`
    fn wait_for_url(&mut self, pattern: &Regex, timeout: Duration) -> SwagResult<()>;

    /// Write a PNG screenshot to `path`
    fn screenshot(&mut self, path: &Path, full_page: bool) -> SwagResult<()>;

    /// Subscribe to console messages
    fn on_console(&mut self, listener: ConsoleListener);

    /// Close the page
    fn close(&mut self) -> SwagResult<()>;
}

/// Fail with [`SwagError::Timeout`] unless `pattern` matches `url`
pub(crate) fn check_url(url: &str, pattern: &Regex, timeout: Duration) -> SwagResult<()> {
    if pattern.is_match(url) {
        Ok(())
    } else {
        Err(SwagError::Timeout {
            what: format!("URL matching {} (at {url})", pattern.as_str()),
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod storage_state_tests {
        use super::*;

        #[test]
        fn test_empty_state() {
            let state = StorageState::new();
            assert!(state.is_empty());
            let state = state.with_local_storage("https://shop.test", "k", "v");
            assert!(!state.is_empty());
        }

        #[test]
        fn test_storage_state_json_shape() {
            let state = StorageState::new()
                .with_cookie(Cookie::new("session-username", "standard_user", "shop.test"));
            let json = serde_json::to_value(&state).unwrap();
            assert_eq!(json["cookies"][0]["name"], "session-username");
            assert_eq!(json["cookies"][0]["httpOnly"], false);
            assert_eq!(json["cookies"][0]["sameSite"], "Lax");
            assert!(json["origins"].as_array().unwrap().is_empty());
        }

        #[test]
        fn test_save_and_load() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("storage/login.json");
            let state = StorageState::new()
                .with_cookie(Cookie::new("session-username", "standard_user", "shop.test"))
                .with_local_storage("https://shop.test", "cart-contents", "[4]")
                .with_local_storage("https://shop.test", "theme", "dark");
            state.save(&path).unwrap();
            let loaded = StorageState::load(&path).unwrap();
            assert_eq!(loaded, state);
            assert_eq!(loaded.origins.len(), 1);
            assert_eq!(loaded.cookie("session-username"), Some("standard_user"));
        }

        #[test]
        fn test_load_missing_fields_defaults() {
            let state: StorageState = serde_json::from_str("{}").unwrap();
            assert!(state.is_empty());
        }
    }

    mod console_tests {
        use super::*;

        #[test]
        fn test_error_kind() {
            assert!(ConsoleMessage::new("error", "boom").is_error());
            assert!(!ConsoleMessage::new("warning", "meh").is_error());
        }

        #[test]
        fn test_location_serializes_camel_case() {
            let msg = ConsoleMessage::new("error", "x").at("https://shop.test/app.js", 3, 7);
            let json = serde_json::to_value(&msg.location).unwrap();
            assert_eq!(json["lineNumber"], 3);
            assert_eq!(json["columnNumber"], 7);
        }
    }

    #[test]
    fn test_check_url() {
        let pattern = Regex::new("/inventory\\.html").unwrap();
        assert!(check_url("https://shop.test/inventory.html", &pattern, Duration::from_secs(1)).is_ok());
        let err = check_url("https://shop.test/", &pattern, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, SwagError::Timeout { ms: 500, .. }));
    }

    #[test]
    fn test_trace_options_full() {
        let opts = TraceOptions::full("attempt_2");
        assert!(opts.screenshots && opts.snapshots && opts.sources);
        assert_eq!(opts.name, "attempt_2");
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId(7).to_string(), "page-7");
    }
}
