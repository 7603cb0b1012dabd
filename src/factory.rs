use std::{fmt, future::Future, sync::Arc};

use futures::FutureExt;
use tracing::instrument;

use crate::{BoxError, ConfigError, FactoryFn, ReaderCache, ReaderSetup};

const UNCONFIGURED_MESSAGE: &str = "no configuration reader factory has been configured; \
     install one with `BindingContext::with_reader_factory` before loading configuration bindings";

const TEST_VALUE_MESSAGE: &str = "a configuration reader factory was used in a test without \
     being configured; supply one with `BindingContext::with_reader_factory` or give the binding \
     an explicit reader";

/// A reader factory whose every call goes through a [`ReaderCache`].
///
/// The wrapped factory runs at most once successfully; later calls return
/// the cached reader. Placeholder factories ([`ReaderFactory::unconfigured`]
/// and [`ReaderFactory::test_value`]) panic when used, since a missing
/// factory is a setup mistake rather than a runtime condition.
#[derive(Clone)]
pub struct ReaderFactory {
    kind: FactoryKind,
}

#[derive(Clone)]
enum FactoryKind {
    Configured {
        factory: FactoryFn,
        cache: ReaderCache,
    },
    Unconfigured,
    TestValue,
}

impl ReaderFactory {
    /// Wraps `factory` with a new cache.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ReaderSetup, BoxError>> + Send + 'static,
    {
        Self::with_cache(ReaderCache::new(), factory)
    }

    /// Wraps `factory`, routing calls through an existing cache.
    pub fn with_cache<F, Fut>(cache: ReaderCache, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ReaderSetup, BoxError>> + Send + 'static,
    {
        let factory: FactoryFn = Arc::new(move || factory().boxed());

        Self {
            kind: FactoryKind::Configured { factory, cache },
        }
    }

    /// Placeholder used when nothing has been configured.
    pub fn unconfigured() -> Self {
        Self {
            kind: FactoryKind::Unconfigured,
        }
    }

    /// Placeholder used in tests; panics with a hint to configure one explicitly.
    pub fn test_value() -> Self {
        Self {
            kind: FactoryKind::TestValue,
        }
    }

    /// Returns `true` if a real factory has been installed.
    pub fn is_configured(&self) -> bool {
        matches!(self.kind, FactoryKind::Configured { .. })
    }

    /// The cache calls are routed through, if configured.
    pub fn cache(&self) -> Option<&ReaderCache> {
        match &self.kind {
            FactoryKind::Configured { cache, .. } => Some(cache),
            _ => None,
        }
    }

    /// Returns the cached reader, running the factory if needed.
    ///
    /// # Errors
    /// * `ConfigError::InitializationFailed` - If the factory failed
    ///
    /// # Panics
    /// Panics if this is a placeholder factory.
    #[instrument(skip(self))]
    pub async fn call(&self) -> Result<ReaderSetup, ConfigError> {
        let (factory, cache) = self.configured();
        let factory = Arc::clone(factory);

        cache.get_or_initialize(move || factory()).await
    }

    /// Refreshes the cached reader's services.
    ///
    /// # Panics
    /// Panics if this is a placeholder factory.
    pub async fn refresh(&self) {
        let (_, cache) = self.configured();
        cache.refresh().await;
    }

    /// Panics now, rather than on first use, if this is a placeholder.
    pub(crate) fn ensure_configured(&self) {
        let _ = self.configured();
    }

    #[allow(clippy::panic)]
    fn configured(&self) -> (&FactoryFn, &ReaderCache) {
        match &self.kind {
            FactoryKind::Configured { factory, cache } => (factory, cache),
            FactoryKind::Unconfigured => panic!("{UNCONFIGURED_MESSAGE}"),
            FactoryKind::TestValue => panic!("{TEST_VALUE_MESSAGE}"),
        }
    }
}

impl Default for ReaderFactory {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl fmt::Debug for ReaderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FactoryKind::Configured { cache, .. } if cache.is_ready() => "ready",
            FactoryKind::Configured { .. } => "configured",
            FactoryKind::Unconfigured => "unconfigured",
            FactoryKind::TestValue => "test value",
        };

        f.debug_struct("ReaderFactory").field("kind", &kind).finish()
    }
}
