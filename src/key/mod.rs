//! Configuration binding keys.
//!
//! A [`ConfigKey`] names a dot-separated path and the value kind expected
//! there. It resolves a reader (either one given explicitly or the cached
//! default reader of a [`BindingContext`]) and turns snapshots into typed
//! values. Keys are read-only: writes are accepted and ignored.


use std::{fmt, marker::PhantomData};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::{debug, instrument, trace};

use crate::{
    Bindable, BindingContext, ConfigError, ConfigReader, ReaderFactory, ReaderId,
    sharing::{DeliveryGate, SharedKey, Subscriber, Subscription},
};

/// Identity of a [`ConfigKey`].
///
/// Two keys are the same binding when they read the same path through the
/// same reader. `reader` is `None` for keys that use the context's default
/// reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKeyId {
    /// Dot-separated path read by the key.
    pub path: String,
    /// Explicit reader the key is bound to, if any.
    pub reader: Option<ReaderId>,
}

#[derive(Clone)]
enum ReaderSource {
    Explicit(ConfigReader),
    Factory(ReaderFactory),
}

/// A read-only binding of a configuration path to a value of type `T`.
#[derive(Clone)]
pub struct ConfigKey<T: Bindable> {
    path: String,
    source: ReaderSource,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bindable> ConfigKey<T> {
    /// Binds `path` to the default reader of `context`.
    pub fn new(path: impl Into<String>, context: &BindingContext) -> Self {
        Self {
            path: path.into(),
            source: ReaderSource::Factory(context.reader_factory().clone()),
            _marker: PhantomData,
        }
    }

    /// Binds `path` to an explicit reader, bypassing the shared cache.
    pub fn with_reader(path: impl Into<String>, reader: ConfigReader) -> Self {
        Self {
            path: path.into(),
            source: ReaderSource::Explicit(reader),
            _marker: PhantomData,
        }
    }

    /// The path this key reads.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Identity of this key.
    pub fn id(&self) -> ConfigKeyId {
        let reader = match &self.source {
            ReaderSource::Explicit(reader) => Some(reader.id()),
            ReaderSource::Factory(_) => None,
        };

        ConfigKeyId {
            path: self.path.clone(),
            reader,
        }
    }

    /// Reads the current value, or `default` if it is absent, of another
    /// kind, or no reader could be resolved.
    ///
    /// # Panics
    /// Panics if the key relies on a context without a configured factory.
    #[instrument(skip(self, default), fields(path = %self.path))]
    pub async fn load(&self, default: T) -> T {
        match self.resolve().await {
            Ok(reader) => reader.get(&self.path).unwrap_or(default),
            Err(e) => {
                debug!(error = %e, "Cannot resolve configuration reader, using default");
                default
            }
        }
    }

    /// Stream of values found at the path, one per snapshot that has one.
    ///
    /// Snapshots without a value of kind `T` at the path are skipped. The
    /// stream ends when the reader's change stream ends or fails, and is
    /// empty if no reader could be resolved.
    ///
    /// # Panics
    /// Panics if the key relies on a context without a configured factory.
    pub fn updates(&self) -> impl Stream<Item = T> + Send + use<T> {
        self.ensure_source();
        let key = self.clone();

        async_stream::stream! {
            if let Some(reader) = key.resolve_for_watch().await {
                let mut snapshots = reader.watch();

                while let Some(item) = snapshots.next().await {
                    match item {
                        Ok(snapshot) => {
                            if let Some(value) = T::extract(&snapshot, &key.path) {
                                yield value;
                            }
                        }
                        Err(e) => {
                            debug!(path = %key.path, error = %e, "Configuration watch failed");
                            break;
                        }
                    }
                }

                trace!(path = %key.path, "Configuration watch ended");
            }
        }
    }

    /// Pushes every value from [`updates`](Self::updates) to `subscriber`
    /// until the returned subscription is cancelled or dropped.
    ///
    /// # Panics
    /// Panics if the key relies on a context without a configured factory.
    pub fn subscribe(&self, subscriber: Subscriber<T>) -> Subscription {
        let updates = self.updates();
        let gate = DeliveryGate::new();
        let task = tokio::spawn(deliver(updates, subscriber, gate.clone()));

        Subscription::new(gate, task)
    }

    /// Ignored; configuration bindings are read-only.
    pub fn set(&self, value: T) {
        trace!(path = %self.path, ?value, "Ignoring write to read-only configuration key");
    }

    async fn resolve(&self) -> Result<ConfigReader, ConfigError> {
        match &self.source {
            ReaderSource::Explicit(reader) => Ok(reader.clone()),
            ReaderSource::Factory(factory) => Ok(factory.call().await?.reader),
        }
    }

    async fn resolve_for_watch(&self) -> Option<ConfigReader> {
        self.resolve()
            .await
            .inspect_err(|e| {
                debug!(path = %self.path, error = %e, "Cannot resolve configuration reader for watch");
            })
            .ok()
    }

    fn ensure_source(&self) {
        if let ReaderSource::Factory(factory) = &self.source {
            factory.ensure_configured();
        }
    }
}

async fn deliver<T, S>(updates: S, subscriber: Subscriber<T>, gate: DeliveryGate)
where
    S: Stream<Item = T> + Send,
{
    tokio::pin!(updates);

    loop {
        let next = tokio::select! {
            biased;
            _ = gate.cancelled() => break,
            next = updates.next() => next,
        };

        let Some(value) = next else {
            break;
        };

        if !gate.deliver(&subscriber, value) {
            break;
        }
    }
}

impl<T: Bindable> fmt::Debug for ConfigKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigKey")
            .field("path", &self.path)
            .field("kind", &T::KIND)
            .field("reader", &self.id().reader)
            .finish()
    }
}

#[async_trait]
impl<T: Bindable> SharedKey for ConfigKey<T> {
    type Value = T;
    type Id = ConfigKeyId;

    fn id(&self) -> ConfigKeyId {
        ConfigKey::id(self)
    }

    async fn load(&self, default: T) -> T {
        ConfigKey::load(self, default).await
    }

    fn subscribe(&self, subscriber: Subscriber<T>) -> Subscription {
        ConfigKey::subscribe(self, subscriber)
    }

    fn set(&self, value: T) {
        ConfigKey::set(self, value)
    }
}
