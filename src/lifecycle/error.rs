use thiserror::Error;

use crate::ConfigError;

/// Errors produced by background services.
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The service stopped with an error.
    #[error("service '{service}' failed: {details}")]
    Failed {
        /// Name of the failing service
        service: String,
        /// Failure details
        details: String,
    },

    /// The service task panicked.
    #[error("service '{service}' panicked")]
    Panicked {
        /// Name of the service that panicked
        service: String,
    },

    /// The service hit a configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServiceError {
    /// Creates a `Failed` error for `service`.
    pub fn failed(service: impl Into<String>, details: impl std::fmt::Display) -> Self {
        ServiceError::Failed {
            service: service.into(),
            details: details.to_string(),
        }
    }
}
