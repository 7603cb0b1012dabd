use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info};

use super::{Service, ServiceError};

/// Runs a set of services concurrently until one of them fails.
///
/// Services that finish cleanly are left to finish; the group keeps running
/// the rest. The first failure (error or panic) aborts the remaining
/// services and is reported through the group's logger span.
pub struct ServiceGroup {
    services: Vec<Arc<dyn Service>>,
    logger: Option<Span>,
    cancellation: CancellationToken,
}

impl ServiceGroup {
    /// Creates a group over `services`.
    ///
    /// # Arguments
    /// * `services` - Services to run
    /// * `logger` - Span under which lifecycle events and failures are logged
    pub fn new(services: Vec<Arc<dyn Service>>, logger: Option<Span>) -> Self {
        Self {
            services,
            logger,
            cancellation: CancellationToken::new(),
        }
    }

    /// Stops the group when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Token that stops the group when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Number of services in the group.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if the group has no services.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Runs every service until one fails, all finish, or the group is cancelled.
    ///
    /// # Errors
    /// Returns the first `ServiceError` raised by a service.
    pub async fn run(self) -> Result<(), ServiceError> {
        let Self {
            services,
            logger,
            cancellation,
        } = self;
        let mut tasks = JoinSet::new();

        for service in services {
            let name = service.name().to_string();
            log(&logger, || debug!(service = %name, "Starting background service"));

            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(service.run()).catch_unwind().await;
                (name, outcome)
            });
        }

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    tasks.abort_all();
                    log(&logger, || info!("Service group cancelled"));
                    return Ok(());
                }

                next = tasks.join_next() => {
                    let failure = match next {
                        None => return Ok(()),
                        Some(Ok((name, Ok(Ok(()))))) => {
                            log(&logger, || debug!(service = %name, "Background service finished"));
                            continue;
                        }
                        Some(Ok((_, Ok(Err(e))))) => e,
                        Some(Ok((name, Err(_)))) => ServiceError::Panicked { service: name },
                        Some(Err(e)) if e.is_cancelled() => continue,
                        Some(Err(_)) => ServiceError::Panicked {
                            service: "unknown".to_string(),
                        },
                    };

                    tasks.abort_all();
                    log(&logger, || error!(error = %failure, "Background service failed"));
                    return Err(failure);
                }
            }
        }
    }
}

fn log(logger: &Option<Span>, event: impl FnOnce()) {
    if let Some(span) = logger {
        span.in_scope(event);
    }
}
