use std::{error::Error, path::PathBuf, sync::Arc};

use thiserror::Error;

/// Boxed error returned by user-supplied reader factories and services.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors that can occur while reading configuration.
///
/// The type is `Clone` so that a single failed initialization attempt can be
/// reported to every caller that was waiting on it.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// The reader factory failed while the cache was being populated.
    #[error("reader initialization failed: {0}")]
    InitializationFailed(#[source] Arc<dyn Error + Send + Sync>),

    /// The specified configuration path does not exist or cannot be navigated.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to parse TOML content
    #[error("failed to parse TOML from {location}: {details}")]
    TomlParseError {
        /// Location of the TOML (file path, "string", etc.)
        location: String,
        /// Parse error details
        details: String,
    },

    /// Error occurred during file I/O operations
    #[error("I/O error on '{path}': {details}")]
    IoError {
        /// Path where I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// Failed to initialize file watcher
    #[error("failed to initialize file watcher: {details}")]
    FileWatcherInitError {
        /// File watcher initialization error details
        details: String,
    },

    /// Error occurred while watching a specific file
    #[error("file watcher error for '{path}': {details}")]
    FileWatchError {
        /// Path being watched when error occurred
        path: PathBuf,
        /// File watcher error details
        details: String,
    },

    /// A required service is unavailable
    #[error("{service} service unavailable: {details}")]
    ServiceUnavailable {
        /// Name of the service that is unavailable
        service: String,
        /// Details about why the service is unavailable
        details: String,
    },
}

impl ConfigError {
    /// Wraps a factory error so it can be shared between waiters.
    pub fn initialization(error: BoxError) -> Self {
        ConfigError::InitializationFailed(Arc::from(error))
    }

    pub(crate) fn toml_parse(error: impl std::fmt::Display, location: impl Into<String>) -> Self {
        ConfigError::TomlParseError {
            location: location.into(),
            details: error.to_string(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
