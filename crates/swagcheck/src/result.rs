//! Result and error types for swagcheck.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for swagcheck operations
pub type SwagResult<T> = Result<T, SwagError>;

/// Errors that can occur in swagcheck
#[derive(Debug, Error)]
pub enum SwagError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Browser context error (creation, tracing, close)
    #[error("Browser context error: {message}")]
    Context {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms: {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Tracing start/stop error
    #[error("Tracing failed: {message}")]
    Tracing {
        /// Error message
        message: String,
    },

    /// A run directory could not be reset
    #[error("Failed to reset workspace directory {}: {source}", path.display())]
    WorkspaceReset {
        /// Directory being reset
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Persisted login state is missing or unusable
    #[error("Login state unavailable: {message}")]
    LoginState {
        /// Error message
        message: String,
    },

    /// Attempt ledger misuse (unknown attempt, double enrichment)
    #[error("Attempt ledger error: {message}")]
    Ledger {
        /// Error message
        message: String,
    },

    /// Report template error
    #[error("Template error: {message}")]
    Template {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Trace archive error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl SwagError {
    /// Create a context error
    #[must_use]
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a tracing error
    #[must_use]
    pub fn tracing(message: impl Into<String>) -> Self {
        Self::Tracing {
            message: message.into(),
        }
    }

    /// Create a ledger error
    #[must_use]
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole session rather than one attempt
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BrowserLaunch { .. } | Self::WorkspaceReset { .. } | Self::LoginState { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_reset_message_names_path() {
        let err = SwagError::WorkspaceReset {
            path: PathBuf::from("artifacts"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
        };
        let text = err.to_string();
        assert!(text.contains("artifacts"));
        assert!(text.contains("locked"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SwagError::LoginState {
            message: "empty".into()
        }
        .is_fatal());
        assert!(!SwagError::page("closed").is_fatal());
        assert!(!SwagError::tracing("not started").is_fatal());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SwagError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
