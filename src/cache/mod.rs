//! Lazily initialized, shared configuration reader.
//!
//! The cache runs a reader factory at most once successfully per process.
//! Concurrent callers that arrive while an initialization is in flight wait
//! for that same attempt instead of starting their own, and a failed
//! attempt leaves the cache empty so the next caller can try again.
//!
//! All state lives in a dedicated actor task that processes requests one at
//! a time. Once a reader is available it is also published to a
//! [`OnceLock`] so that later lookups return synchronously without touching
//! the actor.

mod actor;
mod setup;

#[cfg(test)]
mod tests;

use std::{
    future::Future,
    sync::{Arc, OnceLock},
};

use futures::FutureExt;
use tokio::{
    sync::{
        mpsc::{self, Sender},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{debug, instrument};

use crate::{BoxError, ConfigError, ConfigReader, lifecycle::Service};

use actor::{CacheActor, CacheCommand};
pub use setup::{FactoryFn, FactoryFuture, ReaderSetup};

/// Shared cache of a single initialized configuration reader.
///
/// Cloning produces another handle to the same cache.
#[derive(Clone)]
pub struct ReaderCache {
    command_tx: Sender<CacheCommand>,
    ready: Arc<OnceLock<ConfigReader>>,
    _handle: Arc<JoinHandle<()>>,
}

impl ReaderCache {
    /// Creates an empty cache with its own actor task.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel(100);
        let ready = Arc::new(OnceLock::new());

        let actor = CacheActor::new(Arc::clone(&ready), command_tx.downgrade());
        let handle = tokio::spawn(actor.run(command_rx));

        Self {
            command_tx,
            ready,
            _handle: Arc::new(handle),
        }
    }

    /// Returns the cached reader, initializing it with `factory` if needed.
    ///
    /// If a reader is already cached it is returned immediately and `factory`
    /// is not called. If another caller's initialization is in progress this
    /// call waits for it and shares its outcome. Otherwise `factory` is run
    /// once; on success its services are started in the background.
    ///
    /// Only the caller whose `factory` ran receives the services and logger;
    /// callers that joined its attempt, and every later call, get the reader
    /// alone.
    ///
    /// # Errors
    /// * `ConfigError::InitializationFailed` - If the factory failed or panicked
    /// * `ConfigError::ServiceUnavailable` - If the cache actor has stopped
    pub async fn get_or_initialize<F, Fut>(&self, factory: F) -> Result<ReaderSetup, ConfigError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ReaderSetup, BoxError>> + Send + 'static,
    {
        if let Some(reader) = self.ready.get() {
            return Ok(ReaderSetup::new(reader.clone()));
        }

        self.initialize(Box::new(move || factory().boxed())).await
    }

    /// Asks managed services to refresh, then takes one fresh snapshot.
    ///
    /// Only services that expose [`Refreshable`](crate::lifecycle::Refreshable)
    /// are refreshed; their failures are logged and otherwise ignored. Does
    /// nothing if no reader has been initialized.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let Some((reader, services)) = self.managed().await else {
            debug!("Refresh requested before reader initialization");
            return;
        };

        for service in &services {
            let Some(refreshable) = service.as_refreshable() else {
                continue;
            };

            if let Err(e) = refreshable.refresh().await {
                debug!(service = service.name(), error = %e, "Service refresh failed");
            }
        }

        let _ = reader.snapshot();
    }

    /// The cached reader, if initialization has completed.
    pub fn cached_reader(&self) -> Option<ConfigReader> {
        self.ready.get().cloned()
    }

    /// Returns `true` once a reader has been cached.
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    #[instrument(skip_all)]
    async fn initialize(&self, factory: actor::BoxedFactory) -> Result<ReaderSetup, ConfigError> {
        let (reply, response) = oneshot::channel();

        self.command_tx
            .send(CacheCommand::GetOrInitialize { factory, reply })
            .await
            .map_err(|_| cache_unavailable())?;

        response.await.map_err(|_| cache_unavailable())?
    }

    async fn managed(&self) -> Option<(ConfigReader, Vec<Arc<dyn Service>>)> {
        let (reply, response) = oneshot::channel();

        self.command_tx
            .send(CacheCommand::Managed { reply })
            .await
            .ok()?;

        response.await.ok().flatten()
    }
}

impl Default for ReaderCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_unavailable() -> ConfigError {
    ConfigError::ServiceUnavailable {
        service: "reader cache".to_string(),
        details: "Reader cache actor is not running".to_string(),
    }
}
