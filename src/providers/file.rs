use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use super::file_watcher::FileWatcher;
use crate::{
    ConfigError, ConfigProvider, Snapshot, SnapshotStream,
    lifecycle::{Refreshable, Service, ServiceError},
};

/// Options controlling how a [`TomlFileProvider`] reads and reloads its file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileProviderOptions {
    /// Quiet period after the last file event before the file is re-read, in milliseconds.
    pub debounce_ms: u64,
    /// Treat a missing file as empty configuration instead of an error.
    pub allow_missing: bool,
}

impl Default for FileProviderOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            allow_missing: false,
        }
    }
}

impl FileProviderOptions {
    /// The debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration read from a TOML file and reloaded when the file changes.
///
/// The provider is also a background [`Service`]: while `run` is active the
/// file is watched and re-read after each burst of changes. A reload that
/// fails to parse keeps the last good snapshot. Watchers are only notified
/// when the contents actually change.
pub struct TomlFileProvider {
    path: PathBuf,
    options: FileProviderOptions,
    tx: watch::Sender<Snapshot>,
}

impl TomlFileProvider {
    /// Loads `path` with default options.
    ///
    /// # Errors
    /// * `ConfigError::IoError` - If the file cannot be read
    /// * `ConfigError::TomlParseError` - If the file is not valid TOML
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::with_options(path, FileProviderOptions::default())
    }

    /// Loads `path` with the given options.
    ///
    /// # Errors
    /// * `ConfigError::IoError` - If the file cannot be read
    /// * `ConfigError::TomlParseError` - If the file is not valid TOML
    pub fn with_options(
        path: impl Into<PathBuf>,
        options: FileProviderOptions,
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        info!(path = %path.display(), "Loading configuration file");

        let snapshot = read_snapshot(&path, &options)?;
        let (tx, _) = watch::channel(snapshot);

        Ok(Self { path, options, tx })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, publishing a new snapshot if the contents changed.
    ///
    /// Returns `true` if a new snapshot was published.
    ///
    /// # Errors
    /// * `ConfigError::IoError` - If the file cannot be read
    /// * `ConfigError::TomlParseError` - If the file is not valid TOML
    pub fn reload(&self) -> Result<bool, ConfigError> {
        let snapshot = read_snapshot(&self.path, &self.options)?;

        let changed = self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        if changed {
            info!(path = %self.path.display(), "Configuration file reloaded");
        }

        Ok(changed)
    }
}

impl ConfigProvider for TomlFileProvider {
    fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> SnapshotStream {
        WatchStream::new(self.tx.subscribe()).map(Ok).boxed()
    }
}

#[async_trait]
impl Service for TomlFileProvider {
    fn name(&self) -> &str {
        "toml-file-provider"
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let (mut watcher, mut event_rx) =
            FileWatcher::new().map_err(|e| ConfigError::FileWatcherInitError {
                details: e.to_string(),
            })?;

        watcher
            .watch_file(&self.path)
            .map_err(|e| ConfigError::FileWatchError {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        debug!(path = %self.path.display(), "Watching configuration file");

        let debounce_duration = self.options.debounce();
        let debounce_sleep = tokio::time::sleep(debounce_duration);
        tokio::pin!(debounce_sleep);
        let mut reload_pending = false;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        return Err(ConfigError::FileWatchError {
                            path: self.path.clone(),
                            details: "file watcher stopped".to_string(),
                        }
                        .into());
                    };

                    debug!(path = %event.path.display(), kind = ?event.kind, "Configuration file event");
                    reload_pending = true;
                    debounce_sleep
                        .as_mut()
                        .reset(tokio::time::Instant::now() + debounce_duration);
                }

                _ = &mut debounce_sleep, if reload_pending => {
                    reload_pending = false;

                    if let Err(e) = self.reload() {
                        warn!(error = %e, "Failed to reload configuration file, keeping previous values");
                    }
                }
            }
        }
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

#[async_trait]
impl Refreshable for TomlFileProvider {
    async fn refresh(&self) -> Result<(), ServiceError> {
        self.reload()?;
        Ok(())
    }
}

fn read_snapshot(path: &Path, options: &FileProviderOptions) -> Result<Snapshot, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound && options.allow_missing => {
            debug!(path = %path.display(), "Configuration file missing, using empty configuration");
            return Ok(Snapshot::empty());
        }
        Err(e) => {
            return Err(ConfigError::IoError {
                path: path.to_path_buf(),
                details: e.to_string(),
            });
        }
    };

    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| ConfigError::toml_parse(e, path.display().to_string()))?;

    Ok(Snapshot::new(table))
}
