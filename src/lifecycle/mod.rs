//! Long-running background services and the runner that drives them.

mod error;
mod group;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use error::ServiceError;
pub use group::ServiceGroup;

/// A long-running background task with its own lifecycle.
///
/// `run` executes until the service fails or is stopped from the outside.
/// Returning `Ok(())` means the service finished on its own.
#[async_trait]
pub trait Service: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the service.
    ///
    /// # Errors
    /// Returns `ServiceError` when the service can no longer make progress.
    async fn run(&self) -> Result<(), ServiceError>;

    /// Returns the refresh capability, if this service has one.
    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        None
    }
}

/// Services that can be asked to re-read their source immediately.
#[async_trait]
pub trait Refreshable: Send + Sync {
    /// Refreshes the service's state.
    ///
    /// # Errors
    /// Returns `ServiceError` if the refresh could not be completed.
    async fn refresh(&self) -> Result<(), ServiceError>;
}
