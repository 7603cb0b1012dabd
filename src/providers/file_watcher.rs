use std::{
    collections::HashSet,
    error,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;

/// Represents a file system event for a watched file.
#[derive(Debug, Clone)]
pub(crate) struct FileEvent {
    /// The path of the file that changed
    pub path: PathBuf,
    /// The type of change that occurred
    pub kind: FileEventKind,
}

/// The type of file system change that occurred.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FileEventKind {
    Modified,
    Created,
    Removed,
}

/// Watches individual files and forwards their changes to a Tokio channel.
///
/// The parent directory is watched rather than the file itself so that
/// editors which save by renaming a temporary file over the original are
/// still observed. Events for other files in that directory are dropped.
pub(crate) struct FileWatcher {
    watcher: RecommendedWatcher,
    watched_files: Arc<RwLock<HashSet<PathBuf>>>,
}

impl FileWatcher {
    /// Creates a new file watcher and returns the watcher and event receiver.
    ///
    /// Uses an unbounded channel since file events are typically infrequent but bursty.
    ///
    /// # Errors
    /// Returns error if the underlying file system watcher cannot be initialized.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<FileEvent>), Box<dyn error::Error>> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watched_files = Arc::new(RwLock::new(HashSet::new()));
        let filter = Arc::clone(&watched_files);

        let watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };

            let kind = match event.kind {
                EventKind::Create(_) => FileEventKind::Created,
                EventKind::Modify(_) => FileEventKind::Modified,
                EventKind::Remove(_) => FileEventKind::Removed,
                _ => return,
            };

            let Ok(watched) = filter.read() else {
                return;
            };

            for path in event.paths {
                if watched.contains(&path) {
                    let _ = event_tx.send(FileEvent {
                        path,
                        kind: kind.clone(),
                    });
                }
            }
        })?;

        Ok((
            Self {
                watcher,
                watched_files,
            },
            event_rx,
        ))
    }

    /// Adds a file to the watch list.
    ///
    /// The file itself does not need to exist yet, but its directory does.
    ///
    /// # Errors
    /// Returns error if the directory cannot be resolved or watched.
    pub fn watch_file(&mut self, path: impl AsRef<Path>) -> Result<(), Box<dyn error::Error>> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| format!("'{}' does not name a file", path.display()))?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let directory = parent.canonicalize()?;

        self.watcher
            .watch(&directory, RecursiveMode::NonRecursive)?;

        self.watched_files
            .write()
            .map_err(|_| "watched file set lock poisoned")?
            .insert(directory.join(file_name));

        Ok(())
    }
}
