use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::stream::BoxStream;

use crate::{Bindable, ConfigError, Snapshot};

/// Stream of snapshots produced by a provider's watch.
///
/// An `Err` item means the watch failed; consumers stop reading after it.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, ConfigError>>;

/// A source of configuration snapshots.
pub trait ConfigProvider: Send + Sync {
    /// Returns the configuration as it is right now.
    fn snapshot(&self) -> Snapshot;

    /// Returns a stream that yields the current snapshot and then every
    /// subsequent one as the configuration changes.
    fn watch(&self) -> SnapshotStream;
}

static NEXT_READER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ConfigReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderId(u64);

/// Handle through which configuration snapshots are obtained.
///
/// Clones share the provider and keep the same [`ReaderId`].
#[derive(Clone)]
pub struct ConfigReader {
    id: ReaderId,
    provider: Arc<dyn ConfigProvider>,
}

impl ConfigReader {
    /// Creates a reader over `provider`.
    pub fn new(provider: impl ConfigProvider + 'static) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    /// Creates a reader over an already shared provider.
    pub fn from_arc(provider: Arc<dyn ConfigProvider>) -> Self {
        Self {
            id: ReaderId(NEXT_READER_ID.fetch_add(1, Ordering::Relaxed)),
            provider,
        }
    }

    /// Identity of this reader.
    pub fn id(&self) -> ReaderId {
        self.id
    }

    /// Takes a point-in-time snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.provider.snapshot()
    }

    /// Opens the provider's change stream.
    pub fn watch(&self) -> SnapshotStream {
        self.provider.watch()
    }

    /// Reads a single typed value from a fresh snapshot.
    pub fn get<T: Bindable>(&self, path: &str) -> Option<T> {
        T::extract(&self.snapshot(), path)
    }
}

impl fmt::Debug for ConfigReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigReader").field("id", &self.id).finish()
    }
}
