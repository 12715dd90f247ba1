//! Error types for the preview engine

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur around the preview core.
///
/// Composition itself is total and never fails; these cover the session
/// lifecycle, project file handling and the headless probe.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to set up a session (e.g. no async runtime available)
    #[error("Session initialization failed: {0}")]
    InitializationError(String),

    /// The session was disposed and no longer accepts updates
    #[error("Preview session has been disposed")]
    SessionDisposed,

    /// A required project file does not exist
    #[error("Missing project file: {}", .0.display())]
    MissingSource(std::path::PathBuf),

    /// Failed to read or write project files
    #[error("Project error: {0}")]
    ProjectError(String),

    /// Failed to run the probe harness
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ProjectError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
