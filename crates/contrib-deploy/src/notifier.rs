//! Polling file change detection.
//!
//! [`FileChangeNotifier`] keeps the last observed modification time of every
//! watched file and compares it against the file system on each tick. Ticks
//! run either on demand through [`FileChangeNotifier::tick`] or on a
//! background thread started with [`FileChangeNotifier::start`].

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use contrib_core::ListenerList;
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::config::NotifierConfig;
use crate::error::{Error, Result};

/// A watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Key the file was registered under
    pub id: String,
    pub path: PathBuf,
    /// Modification time seen on the last tick, `None` if the file did not
    /// exist yet
    pub last_modified: Option<SystemTime>,
}

/// Receives change notifications.
pub trait FileChangeListener: Send + Sync {
    /// Called once per changed file per tick. Every notification from the
    /// same tick carries the same `stamp`.
    fn file_changed(&self, entry: &FileEntry, stamp: SystemTime);
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Polls watched files for modification time changes.
pub struct FileChangeNotifier {
    config: NotifierConfig,
    files: Mutex<IndexMap<String, FileEntry>>,
    listeners: ListenerList<dyn FileChangeListener>,
    worker: Mutex<Option<Worker>>,
}

impl Default for FileChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FileChangeNotifier {
    /// Notifier with the default schedule (first poll after 10s, then every 2s).
    pub fn new() -> Self {
        Self::with_config(NotifierConfig::default())
    }

    pub fn with_config(config: NotifierConfig) -> Self {
        Self {
            config,
            files: Mutex::new(IndexMap::new()),
            listeners: ListenerList::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> NotifierConfig {
        self.config
    }

    /// Start watching `path` under `id`, replacing any previous watch with
    /// the same id.
    pub fn watch(&self, id: &str, path: impl Into<PathBuf>) {
        let path = path.into();
        let last_modified = match modified(&path) {
            Ok(time) => Some(time),
            Err(err) => {
                tracing::debug!(id, path = %path.display(), error = %err, "Watching file without modification time");
                None
            }
        };
        tracing::debug!(id, path = %path.display(), "Watching file");
        self.files.lock().insert(
            id.to_string(),
            FileEntry {
                id: id.to_string(),
                path,
                last_modified,
            },
        );
    }

    /// Stop watching `id`. Returns whether it was watched.
    pub fn unwatch(&self, id: &str) -> bool {
        let removed = self.files.lock().shift_remove(id).is_some();
        if removed {
            tracing::debug!(id, "Stopped watching file");
        }
        removed
    }

    pub fn unwatch_all(&self) {
        self.files.lock().clear();
    }

    pub fn is_watching(&self, id: &str) -> bool {
        self.files.lock().contains_key(id)
    }

    /// Watched files, in the order they were added.
    pub fn watched(&self) -> Vec<FileEntry> {
        self.files.lock().values().cloned().collect()
    }

    pub fn add_listener(&self, listener: Arc<dyn FileChangeListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn FileChangeListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Poll every watched file once and notify listeners of changes.
    ///
    /// Works on a snapshot of the watch set, so listeners may watch and
    /// unwatch files while being notified. Files that cannot be read are
    /// logged and retried on the next tick. Returns the number of changed
    /// files.
    pub fn tick(&self) -> usize {
        let snapshot = self.watched();
        let stamp = SystemTime::now();

        let mut changed = Vec::new();
        for entry in snapshot {
            let current = match modified(&entry.path) {
                Ok(time) => time,
                Err(err) => {
                    tracing::warn!(
                        id = %entry.id,
                        path = %entry.path.display(),
                        error = %err,
                        "Cannot read watched file"
                    );
                    continue;
                }
            };
            if entry.last_modified == Some(current) {
                continue;
            }

            let mut files = self.files.lock();
            // Skip files unwatched or re-pointed since the snapshot.
            if let Some(live) = files.get_mut(&entry.id).filter(|live| live.path == entry.path) {
                live.last_modified = Some(current);
                changed.push(live.clone());
            }
        }

        if !changed.is_empty() {
            let listeners = self.listeners.snapshot();
            for entry in &changed {
                tracing::debug!(id = %entry.id, path = %entry.path.display(), "File changed");
                for listener in listeners.iter() {
                    listener.file_changed(entry, stamp);
                }
            }
        }
        changed.len()
    }

    /// Start polling on a background thread.
    ///
    /// The thread only holds a weak reference, so dropping the last handle
    /// to the notifier stops it. Starting a running notifier does nothing.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let notifier: Weak<Self> = Arc::downgrade(self);
        let initial_delay = self.config.initial_delay();
        let interval = self.config.interval();

        let handle = thread::Builder::new()
            .name("file-change-notifier".into())
            .spawn(move || {
                let mut wait = initial_delay;
                loop {
                    match stopped.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(notifier) = notifier.upgrade() else {
                                break;
                            };
                            notifier.tick();
                            wait = interval;
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("File change notifier stopped");
            })
            .map_err(|source| Error::Spawn { source })?;

        tracing::debug!(
            initial_delay_ms = self.config.initial_delay_ms,
            interval_ms = self.config.interval_ms,
            "File change notifier started"
        );
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Stop the polling thread and wait for it to finish. A tick already in
    /// progress completes first.
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        let _ = worker.stop.send(());
        // Stopping from inside a listener runs on the polling thread itself.
        if worker.handle.thread().id() != thread::current().id() && worker.handle.join().is_err() {
            tracing::error!("File change notifier thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }
}

impl Drop for FileChangeNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FileChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileChangeNotifier")
            .field("config", &self.config)
            .field("watched", &self.files.lock().len())
            .field("running", &self.is_running())
            .finish()
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}
