use std::{fmt, sync::Arc};

use futures::future::BoxFuture;
use tracing::Span;

use crate::{BoxError, ConfigReader, lifecycle::Service};

/// Future returned by a reader factory.
pub type FactoryFuture = BoxFuture<'static, Result<ReaderSetup, BoxError>>;

/// Reusable reader factory, as stored in a [`ReaderFactory`](crate::ReaderFactory).
pub type FactoryFn = Arc<dyn Fn() -> FactoryFuture + Send + Sync>;

/// The result of initializing a configuration reader.
///
/// Produced by a reader factory and handed back by the cache. `services`
/// and `logger` are only present for the caller whose factory ran; every
/// other caller receives the reader alone.
#[derive(Clone)]
pub struct ReaderSetup {
    /// Reader through which snapshots are taken.
    pub reader: ConfigReader,
    /// Background services the reader depends on.
    pub services: Option<Vec<Arc<dyn Service>>>,
    /// Span under which service lifecycle events are logged.
    pub logger: Option<Span>,
}

impl ReaderSetup {
    /// A setup consisting of just a reader.
    pub fn new(reader: ConfigReader) -> Self {
        Self {
            reader,
            services: None,
            logger: None,
        }
    }

    /// Adds background services that must run for the reader to stay current.
    pub fn with_services(mut self, services: Vec<Arc<dyn Service>>) -> Self {
        self.services = Some(services);
        self
    }

    /// Adds a service that must run for the reader to stay current.
    pub fn with_service(mut self, service: Arc<dyn Service>) -> Self {
        self.services.get_or_insert_with(Vec::new).push(service);
        self
    }

    /// Sets the span used to log service lifecycle events.
    pub fn with_logger(mut self, logger: Span) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for ReaderSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: Option<Vec<&str>> = self
            .services
            .as_ref()
            .map(|services| services.iter().map(|service| service.name()).collect());

        f.debug_struct("ReaderSetup")
            .field("reader", &self.reader)
            .field("services", &services)
            .field("logger", &self.logger)
            .finish()
    }
}
