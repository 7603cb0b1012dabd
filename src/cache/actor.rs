use std::{
    mem,
    sync::{Arc, OnceLock},
};

use tokio::sync::{
    mpsc::{Receiver, WeakSender},
    oneshot,
};
use tracing::{debug, info, warn};

use super::{ReaderSetup, setup::FactoryFuture};
use crate::{
    ConfigError, ConfigReader,
    lifecycle::{Service, ServiceGroup},
};

pub(super) type InitReply = oneshot::Sender<Result<ReaderSetup, ConfigError>>;
pub(super) type BoxedFactory = Box<dyn FnOnce() -> FactoryFuture + Send>;

/// Commands processed by the cache actor, one at a time.
pub(super) enum CacheCommand {
    /// Return the cached reader, joining or starting an initialization if needed
    GetOrInitialize {
        factory: BoxedFactory,
        reply: InitReply,
    },
    /// Report the reader and services currently under management
    Managed {
        reply: oneshot::Sender<Option<(ConfigReader, Vec<Arc<dyn Service>>)>>,
    },
    /// An initialization task has completed
    AttemptFinished {
        attempt: u64,
        outcome: Result<ReaderSetup, ConfigError>,
    },
}

enum CacheState {
    Empty,
    Initializing {
        attempt: u64,
        waiters: Vec<InitReply>,
    },
    Ready {
        reader: ConfigReader,
        services: Vec<Arc<dyn Service>>,
    },
}

/// Sole owner of the cache state.
pub(super) struct CacheActor {
    state: CacheState,
    attempts: u64,
    ready: Arc<OnceLock<ConfigReader>>,
    command_tx: WeakSender<CacheCommand>,
}

impl CacheActor {
    pub(super) fn new(
        ready: Arc<OnceLock<ConfigReader>>,
        command_tx: WeakSender<CacheCommand>,
    ) -> Self {
        Self {
            state: CacheState::Empty,
            attempts: 0,
            ready,
            command_tx,
        }
    }

    /// Processes commands until every sender is gone.
    pub(super) async fn run(mut self, mut command_rx: Receiver<CacheCommand>) {
        while let Some(command) = command_rx.recv().await {
            self.handle(command);
        }

        debug!("Reader cache actor stopped");
    }

    fn handle(&mut self, command: CacheCommand) {
        match command {
            CacheCommand::GetOrInitialize { factory, reply } => match &mut self.state {
                CacheState::Ready { reader, .. } => {
                    let _ = reply.send(Ok(ReaderSetup::new(reader.clone())));
                }
                CacheState::Initializing { waiters, .. } => waiters.push(reply),
                CacheState::Empty => self.start_attempt(factory, reply),
            },

            CacheCommand::Managed { reply } => {
                let managed = match &self.state {
                    CacheState::Ready { reader, services } => {
                        Some((reader.clone(), services.clone()))
                    }
                    _ => None,
                };
                let _ = reply.send(managed);
            }

            CacheCommand::AttemptFinished { attempt, outcome } => {
                self.finish_attempt(attempt, outcome);
            }
        }
    }

    fn start_attempt(&mut self, factory: BoxedFactory, reply: InitReply) {
        let Some(command_tx) = self.command_tx.upgrade() else {
            let _ = reply.send(Err(ConfigError::ServiceUnavailable {
                service: "reader cache".to_string(),
                details: "cache is shutting down".to_string(),
            }));
            return;
        };

        self.attempts += 1;
        let attempt = self.attempts;
        self.state = CacheState::Initializing {
            attempt,
            waiters: vec![reply],
        };
        debug!(attempt, "Starting reader initialization");

        tokio::spawn(async move {
            let outcome = match tokio::spawn(async move { factory().await }).await {
                Ok(Ok(setup)) => Ok(setup),
                Ok(Err(e)) => Err(ConfigError::initialization(e)),
                Err(e) => Err(ConfigError::initialization(
                    format!("reader factory panicked: {e}").into(),
                )),
            };

            let _ = command_tx
                .send(CacheCommand::AttemptFinished { attempt, outcome })
                .await;
        });
    }

    fn finish_attempt(&mut self, attempt: u64, outcome: Result<ReaderSetup, ConfigError>) {
        let waiters = match mem::replace(&mut self.state, CacheState::Empty) {
            CacheState::Initializing {
                attempt: current,
                waiters,
            } if current == attempt => waiters,
            other => {
                self.state = other;
                return;
            }
        };

        match outcome {
            Ok(setup) => {
                let services = setup.services.clone().unwrap_or_default();

                let _ = self.ready.set(setup.reader.clone());
                if !services.is_empty() {
                    let group = ServiceGroup::new(services.clone(), setup.logger.clone());
                    // Failures are reported through the setup's logger.
                    tokio::spawn(async move {
                        let _ = group.run().await;
                    });
                }

                info!(
                    attempt,
                    reader = ?setup.reader.id(),
                    services = services.len(),
                    "Configuration reader initialized"
                );
                self.state = CacheState::Ready {
                    reader: setup.reader.clone(),
                    services,
                };

                // Only the caller that started the attempt owns the services.
                let joined = ReaderSetup::new(setup.reader.clone());
                let mut waiters = waiters.into_iter();
                if let Some(initializer) = waiters.next() {
                    let _ = initializer.send(Ok(setup));
                }
                for waiter in waiters {
                    let _ = waiter.send(Ok(joined.clone()));
                }
            }
            Err(e) => {
                warn!(attempt, error = %e, "Configuration reader initialization failed");

                for waiter in waiters {
                    let _ = waiter.send(Err(e.clone()));
                }
            }
        }
    }
}
