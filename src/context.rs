use crate::{Bindable, ConfigKey, ReaderFactory};

/// Dependencies shared by configuration bindings.
///
/// Holds the [`ReaderFactory`] that keys without an explicit reader resolve
/// through. The default context is unconfigured: binding keys created from
/// it panic on first use until a factory is installed.
#[derive(Clone, Debug, Default)]
pub struct BindingContext {
    reader_factory: ReaderFactory,
}

impl BindingContext {
    /// A context whose keys resolve through `reader_factory`.
    pub fn new(reader_factory: ReaderFactory) -> Self {
        Self { reader_factory }
    }

    /// Placeholder context for tests that must configure a factory explicitly.
    pub fn test_value() -> Self {
        Self::new(ReaderFactory::test_value())
    }

    /// Replaces the reader factory.
    pub fn with_reader_factory(mut self, reader_factory: ReaderFactory) -> Self {
        self.reader_factory = reader_factory;
        self
    }

    /// The factory keys resolve through.
    pub fn reader_factory(&self) -> &ReaderFactory {
        &self.reader_factory
    }

    /// Creates a key for `path` bound to this context's default reader.
    pub fn key<T: Bindable>(&self, path: impl Into<String>) -> ConfigKey<T> {
        ConfigKey::new(path, self)
    }

    /// Refreshes the services behind the default reader.
    ///
    /// # Panics
    /// Panics if no factory has been configured.
    pub async fn refresh(&self) {
        self.reader_factory.refresh().await;
    }
}
