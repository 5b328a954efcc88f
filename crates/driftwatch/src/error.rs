//! Error types for the change detection system.

use thiserror::Error;

/// Errors that can occur during watching and diffing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pattern matching error.
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Change handler error.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Backend not available.
    #[error("Backend '{0}' is not available")]
    BackendUnavailable(String),

    /// Watcher is not running.
    #[error("Watcher is not running")]
    NotRunning,

    /// Watcher is already running.
    #[error("Watcher is already running")]
    AlreadyRunning,

    /// Invalid path.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for watching and diffing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert notify errors to our error type.
impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}

/// Convert globset errors to our error type.
impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Self {
        Error::Pattern(err.to_string())
    }
}

/// Convert regex errors to our error type.
impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Pattern(err.to_string())
    }
}
