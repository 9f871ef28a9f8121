//! Error types for dropmirror.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=auth, 8=everything else)
//! - Context-aware recovery hints

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dropmirror operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Only authentication problems get their own exit code;
/// anything that aborts a run exits with 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Auth (exit 2)
    NotLoggedIn,
    LoginCancelled,

    // Config
    InvalidPattern,
    InvalidArgument,
    ConfigError,

    // Storage
    DatabaseError,

    // Remote
    RemoteError,

    // Local filesystem
    IoError,
    JsonError,
    SymlinkError,

    // Internal
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::LoginCancelled => "LOGIN_CANCELLED",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::RemoteError => "REMOTE_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::SymlinkError => "SYMLINK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotLoggedIn | Self::LoginCancelled => 2,
            Self::InvalidPattern
            | Self::InvalidArgument
            | Self::ConfigError
            | Self::DatabaseError
            | Self::RemoteError
            | Self::IoError
            | Self::JsonError
            | Self::SymlinkError
            | Self::InternalError => 8,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur while mirroring.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not log in: no usable credential for {local}")]
    NotLoggedIn { local: PathBuf },

    #[error("Login cancelled")]
    LoginCancelled,

    #[error("Invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Cannot create symlink {}: {source}", path.display())]
    Symlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotLoggedIn { .. } => ErrorCode::NotLoggedIn,
            Self::LoginCancelled => ErrorCode::LoginCancelled,
            Self::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Http(_) | Self::Remote { .. } => ErrorCode::RemoteError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Symlink { .. } => ErrorCode::SymlinkError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Message for the error line; verbose runs lead with the code.
    #[must_use]
    pub fn message(&self, with_code: bool) -> String {
        if with_code {
            format!("[{}] {self}", self.error_code().as_str())
        } else {
            self.to_string()
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotLoggedIn { local } => Some(format!(
                "Try `dropmirror --login {}` or pass an access token with --token",
                local.display()
            )),
            Self::LoginCancelled => {
                Some("Paste the authorization code shown after approving access".to_string())
            }
            Self::InvalidPattern { .. } => Some(
                "Patterns are regular expressions matched case-insensitively against \
                 the remote path, relative to the remote root"
                    .to_string(),
            ),
            Self::Symlink { .. } => {
                Some("Use --ignsymlink to continue past symlink failures".to_string())
            }
            Self::Remote { status: 401, .. } => {
                Some("The stored credential was rejected. Run again with --login".to_string())
            }
            Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Remote { .. }
            | Self::Other(_) => None,
        }
    }
}
