use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::{
    ConfigError, ConfigProvider, Snapshot, SnapshotStream, TypedValue, snapshot::set_value_at_path,
};

/// Configuration held in memory and published through a watch channel.
///
/// Every update replaces the current snapshot and notifies all watchers.
/// Watchers only ever see the latest snapshot; intermediate ones may be
/// skipped when updates arrive faster than they are consumed.
#[derive(Clone)]
pub struct InMemoryProvider {
    tx: watch::Sender<Snapshot>,
}

impl InMemoryProvider {
    /// Creates a provider whose initial contents are `table`.
    pub fn new(table: toml::Table) -> Self {
        let (tx, _) = watch::channel(Snapshot::new(table));
        Self { tx }
    }

    /// Creates a provider from TOML text.
    ///
    /// # Errors
    /// * `ConfigError::TomlParseError` - If the text is not valid TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let snapshot = Snapshot::from_toml_str(content)?;
        let (tx, _) = watch::channel(snapshot);
        Ok(Self { tx })
    }

    /// Sets a single value and publishes the resulting snapshot.
    ///
    /// # Arguments
    /// * `path` - Dot-separated path to the value (e.g., "server.port")
    /// * `value` - The new value
    ///
    /// # Errors
    /// * `ConfigError::InvalidPath` - If the path crosses a non-table value
    pub fn set(&self, path: &str, value: impl Into<TypedValue>) -> Result<(), ConfigError> {
        let value = value.into().into_toml();
        let mut outcome = Ok(());

        self.tx.send_if_modified(|snapshot| {
            let mut root = snapshot.as_value().clone();
            if let Err(e) = set_value_at_path(&mut root, path, value) {
                outcome = Err(e);
                return false;
            }

            match root {
                toml::Value::Table(table) => {
                    *snapshot = Snapshot::new(table);
                    true
                }
                _ => false,
            }
        });

        if outcome.is_ok() {
            debug!(path, "Published in-memory configuration update");
        }

        outcome
    }

    /// Replaces the whole configuration.
    pub fn replace(&self, table: toml::Table) {
        self.tx.send_replace(Snapshot::new(table));
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(toml::Table::new())
    }
}

impl ConfigProvider for InMemoryProvider {
    fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> SnapshotStream {
        WatchStream::new(self.tx.subscribe()).map(Ok).boxed()
    }
}
