//! Artifact store: run directory layout and per-attempt evidence bundles.
//!
//! ```text
//! <root>/
//! ├── artifacts/<module>/<class|no_class>/<test>/attempt_<N>/   promoted evidence
//! ├── videos/attempt_<N>/*.webm                                 transient
//! ├── tracing/attempt_<N>/trace.zip                             transient
//! ├── report-results/                                           report output
//! └── storage/login.json                                        login state
//! ```

use crate::result::{SwagError, SwagResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Screenshot taken at failure time
pub const SCREENSHOT_FILE: &str = "failure.png";
/// Page URL at failure time
pub const URL_FILE: &str = "url.txt";
/// Buffered console errors
pub const CONSOLE_FILE: &str = "console_errors.json";
/// Raw assertion failure text
pub const FAILURE_TEXT_FILE: &str = "test_failure_errors.txt";
/// Trace archive
pub const TRACE_FILE: &str = "trace.zip";
/// Video file extension
pub const VIDEO_EXTENSION: &str = "webm";
/// Class segment used for free functions
pub const NO_CLASS: &str = "no_class";

/// Identity of one test item: module, optional class, and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestId {
    /// Module (file stem) the test lives in
    pub module: String,
    /// Enclosing class/group, if any
    pub class: Option<String>,
    /// Test name, including any parameter id
    pub name: String,
}

impl TestId {
    /// Create a test id without a class
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: None,
            name: name.into(),
        }
    }

    /// Set the enclosing class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Class segment, `no_class` when absent
    #[must_use]
    pub fn class_segment(&self) -> &str {
        self.class.as_deref().unwrap_or(NO_CLASS)
    }

    /// `module::Class::name` style identifier
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.class {
            Some(class) => format!("{}::{}::{}", self.module, class, self.name),
            None => format!("{}::{}", self.module, self.name),
        }
    }

    /// Relative directory `<module>/<class>/<name>`
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(sanitize_segment(&self.module))
            .join(sanitize_segment(self.class_segment()))
            .join(sanitize_segment(&self.name))
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl std::str::FromStr for TestId {
    type Err = SwagError;

    /// Parse `module::name` or `module::Class::name`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("::").collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(SwagError::invalid_state(format!("malformed test id: {s}")));
        }
        match parts.as_slice() {
            [module, name] => Ok(Self::new(*module, *name)),
            [module, class, name] => Ok(Self::new(*module, *name).with_class(*class)),
            _ => Err(SwagError::invalid_state(format!(
                "test id must be module::name or module::Class::name, got {s}"
            ))),
        }
    }
}

/// Replace characters that would escape a single path segment
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Name of the per-attempt directory
#[must_use]
pub fn attempt_dir_name(attempt: u32) -> String {
    format!("attempt_{attempt}")
}

/// Fixed directory layout of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    /// Layout rooted at `root`
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Run root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Promoted evidence root
    #[must_use]
    pub fn artifacts(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// Transient video root
    #[must_use]
    pub fn videos(&self) -> PathBuf {
        self.root.join("videos")
    }

    /// Transient trace root
    #[must_use]
    pub fn tracing(&self) -> PathBuf {
        self.root.join("tracing")
    }

    /// Report output root
    #[must_use]
    pub fn report_results(&self) -> PathBuf {
        self.root.join("report-results")
    }

    /// Login state root
    #[must_use]
    pub fn storage(&self) -> PathBuf {
        self.root.join("storage")
    }

    /// Persisted authenticated session state
    #[must_use]
    pub fn login_state(&self) -> PathBuf {
        self.storage().join("login.json")
    }

    /// Directories cleared at session start
    #[must_use]
    pub fn managed_dirs(&self) -> [PathBuf; 5] {
        [
            self.artifacts(),
            self.videos(),
            self.tracing(),
            self.report_results(),
            self.storage(),
        ]
    }

    /// Promoted evidence directory for one attempt of one test
    #[must_use]
    pub fn attempt_dir(&self, test: &TestId, attempt: u32) -> PathBuf {
        self.artifacts()
            .join(test.relative_dir())
            .join(attempt_dir_name(attempt))
    }

    /// Transient video directory for an attempt
    #[must_use]
    pub fn transient_video_dir(&self, attempt: u32) -> PathBuf {
        self.videos().join(attempt_dir_name(attempt))
    }

    /// Transient tracing directory for an attempt
    #[must_use]
    pub fn transient_trace_dir(&self, attempt: u32) -> PathBuf {
        self.tracing().join(attempt_dir_name(attempt))
    }

    /// Delete and recreate every managed directory.
    ///
    /// A directory that cannot be removed (locked file, permissions) is a
    /// fatal [`SwagError::WorkspaceReset`].
    pub fn reset_workspace(&self) -> SwagResult<()> {
        for dir in self.managed_dirs() {
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|source| SwagError::WorkspaceReset {
                    path: dir.clone(),
                    source,
                })?;
            }
            fs::create_dir_all(&dir).map_err(|source| SwagError::WorkspaceReset {
                path: dir.clone(),
                source,
            })?;
        }
        tracing::info!(root = %self.root.display(), "workspace reset");
        Ok(())
    }
}

/// Presence flags for the evidence of one attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactFlags {
    /// `failure.png` exists and is non-empty
    pub screenshot: bool,
    /// At least one video file exists
    pub video: bool,
    /// `trace.zip` exists
    pub trace: bool,
}

/// Files making up one failed attempt's evidence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    /// Bundle directory
    pub dir: PathBuf,
    /// Screenshot, when captured
    pub screenshot: Option<PathBuf>,
    /// URL text file, when captured
    pub url_file: Option<PathBuf>,
    /// Console error JSON, when captured
    pub console_file: Option<PathBuf>,
    /// Assertion failure text, when written
    pub failure_text: Option<PathBuf>,
    /// Video files, sorted by name
    pub videos: Vec<PathBuf>,
    /// Trace archive, when promoted
    pub trace: Option<PathBuf>,
}

impl ArtifactBundle {
    /// Inspect an attempt directory
    pub fn scan(dir: &Path) -> SwagResult<Self> {
        let mut bundle = Self {
            dir: dir.to_path_buf(),
            ..Self::default()
        };
        if !dir.is_dir() {
            return Ok(bundle);
        }
        bundle.screenshot = non_empty_file(&dir.join(SCREENSHOT_FILE));
        bundle.url_file = existing_file(&dir.join(URL_FILE));
        bundle.console_file = existing_file(&dir.join(CONSOLE_FILE));
        bundle.failure_text = existing_file(&dir.join(FAILURE_TEXT_FILE));
        bundle.trace = existing_file(&dir.join(TRACE_FILE));
        bundle.videos = list_videos(dir)?;
        Ok(bundle)
    }

    /// Presence flags
    #[must_use]
    pub fn flags(&self) -> ArtifactFlags {
        ArtifactFlags {
            screenshot: self.screenshot.is_some(),
            video: !self.videos.is_empty(),
            trace: self.trace.is_some(),
        }
    }

    /// URL recorded at failure time, trimmed
    pub fn recorded_url(&self) -> SwagResult<Option<String>> {
        match &self.url_file {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                let text = text.trim();
                Ok((!text.is_empty()).then(|| text.to_string()))
            }
            None => Ok(None),
        }
    }
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

fn non_empty_file(path: &Path) -> Option<PathBuf> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file() && m.len() > 0)
        .map(|_| path.to_path_buf())
}

/// Video files directly inside `dir`, sorted by name
pub fn list_videos(dir: &Path) -> SwagResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == VIDEO_EXTENSION) {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Move a file, falling back to copy + remove across filesystems
pub fn move_file(from: &Path, to: &Path) -> SwagResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Remove a directory tree, ignoring a missing directory
pub fn remove_dir_if_exists(dir: &Path) -> SwagResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod test_id_tests {
        use super::*;

        #[test]
        fn test_class_segment_defaults() {
            let id = TestId::new("cart_test", "test_add_to_cart");
            assert_eq!(id.class_segment(), "no_class");
            assert_eq!(id.full_name(), "cart_test::test_add_to_cart");
        }

        #[test]
        fn test_parse_full_name() {
            let id: TestId = "test_cart::TestCart::test_badge".parse().unwrap();
            assert_eq!(id, TestId::new("test_cart", "test_badge").with_class("TestCart"));
            let free: TestId = "test_login::test_ok".parse().unwrap();
            assert_eq!(free.class, None);
            assert!("single".parse::<TestId>().is_err());
            assert!("a::::b".parse::<TestId>().is_err());
        }

        #[test]
        fn test_relative_dir_with_class() {
            let id = TestId::new("login_test", "test_login_fail[empty_password]").with_class("TestLogin");
            assert_eq!(
                id.relative_dir(),
                PathBuf::from("login_test/TestLogin/test_login_fail[empty_password]")
            );
        }

        #[test]
        fn test_separators_cannot_escape() {
            let id = TestId::new("../etc", "a/b");
            let rel = id.relative_dir();
            assert_eq!(rel, PathBuf::from(".._etc/no_class/a_b"));
            let id = TestId::new("..", "x");
            assert_eq!(id.relative_dir(), PathBuf::from("_/no_class/x"));
        }
    }

    mod layout_tests {
        use super::*;

        #[test]
        fn test_paths() {
            let layout = RunLayout::new("/run");
            let id = TestId::new("cart_test", "test_badge").with_class("TestCart");
            assert_eq!(
                layout.attempt_dir(&id, 2),
                PathBuf::from("/run/artifacts/cart_test/TestCart/test_badge/attempt_2")
            );
            assert_eq!(layout.transient_video_dir(1), PathBuf::from("/run/videos/attempt_1"));
            assert_eq!(layout.transient_trace_dir(3), PathBuf::from("/run/tracing/attempt_3"));
            assert_eq!(layout.login_state(), PathBuf::from("/run/storage/login.json"));
        }

        #[test]
        fn test_reset_clears_previous_run() {
            let dir = tempfile::tempdir().unwrap();
            let layout = RunLayout::new(dir.path());
            fs::create_dir_all(layout.artifacts().join("old")).unwrap();
            fs::write(layout.artifacts().join("old/failure.png"), b"x").unwrap();
            fs::write(dir.path().join("keep.txt"), b"keep").unwrap();

            layout.reset_workspace().unwrap();

            for managed in layout.managed_dirs() {
                assert!(managed.is_dir());
                assert_eq!(fs::read_dir(&managed).unwrap().count(), 0);
            }
            assert!(dir.path().join("keep.txt").exists());
        }

        #[test]
        fn test_reset_fails_when_dir_is_a_file() {
            let dir = tempfile::tempdir().unwrap();
            let layout = RunLayout::new(dir.path().join("root-file"));
            fs::write(dir.path().join("root-file"), b"not a dir").unwrap();
            let err = layout.reset_workspace().unwrap_err();
            assert!(matches!(err, SwagError::WorkspaceReset { .. }));
            assert!(err.is_fatal());
        }
    }

    mod bundle_tests {
        use super::*;

        #[test]
        fn test_scan_missing_dir_is_empty() {
            let bundle = ArtifactBundle::scan(Path::new("/definitely/not/here")).unwrap();
            assert_eq!(bundle.flags(), ArtifactFlags::default());
        }

        #[test]
        fn test_scan_full_bundle() {
            let dir = tempfile::tempdir().unwrap();
            let d = dir.path();
            fs::write(d.join(SCREENSHOT_FILE), b"\x89PNG").unwrap();
            fs::write(d.join(URL_FILE), "https://shop.test/cart.html\n").unwrap();
            fs::write(d.join(CONSOLE_FILE), "[]").unwrap();
            fs::write(d.join("b.webm"), b"v").unwrap();
            fs::write(d.join("a.webm"), b"v").unwrap();
            fs::write(d.join(TRACE_FILE), b"PK").unwrap();

            let bundle = ArtifactBundle::scan(d).unwrap();
            assert_eq!(
                bundle.flags(),
                ArtifactFlags {
                    screenshot: true,
                    video: true,
                    trace: true
                }
            );
            assert_eq!(bundle.videos.len(), 2);
            assert!(bundle.videos[0].ends_with("a.webm"));
            assert_eq!(
                bundle.recorded_url().unwrap().as_deref(),
                Some("https://shop.test/cart.html")
            );
            assert!(bundle.failure_text.is_none());
        }

        #[test]
        fn test_empty_screenshot_not_counted() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join(SCREENSHOT_FILE), b"").unwrap();
            let bundle = ArtifactBundle::scan(dir.path()).unwrap();
            assert!(!bundle.flags().screenshot);
        }
    }

    #[test]
    fn test_move_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("trace.zip");
        fs::write(&from, b"PK").unwrap();
        let to = dir.path().join("deep/nested/trace.zip");
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"PK");
    }

    #[test]
    fn test_remove_missing_dir_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_dir_if_exists(&dir.path().join("nope")).is_ok());
    }
}
