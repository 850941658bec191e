use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use scened_common::RealFileSystem;
use scened_editor::ResourceDelta;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// Watches a content root and reports changes as resource paths.
///
/// notify delivers events on its own thread; they are only queued here and
/// turned into [`ResourceDelta`]s by the thread that owns the documents.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
    content: RealFileSystem,
}

impl FileWatcher {
    pub fn new(root: &Path) -> WatcherResult<Self> {
        // Events carry canonical paths
        let root = root
            .canonicalize()
            .map_err(|e| WatcherError::WatchError(format!("{}: {}", root.display(), e)))?;
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "Watching content root");

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            content: RealFileSystem::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        self.content.root()
    }

    /// Everything queued so far, without blocking. Empty when nothing changed.
    pub fn try_delta(&self) -> ResourceDelta {
        let mut delta = ResourceDelta::new();
        while let Ok(event) = self.receiver.try_recv() {
            self.collect(event, &mut delta);
        }
        delta
    }

    /// Wait up to `timeout` for a change, then drain whatever else is queued.
    /// Returns `None` on timeout or once the watcher is gone.
    pub fn next_delta(&self, timeout: Duration) -> Option<ResourceDelta> {
        let mut delta = ResourceDelta::new();
        while delta.is_empty() {
            match self.receiver.recv_timeout(timeout) {
                Ok(event) => self.collect(event, &mut delta),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        while let Ok(event) = self.receiver.try_recv() {
            self.collect(event, &mut delta);
        }
        Some(delta)
    }

    fn collect(&self, event: notify::Result<Event>, delta: &mut ResourceDelta) {
        match event {
            Ok(event) => add_event(&self.content, &event, delta),
            Err(err) => warn!(error = %err, "File watcher error"),
        }
    }
}

/// Add the resources touched by `event` to `delta`
pub fn add_event(content: &RealFileSystem, event: &Event, delta: &mut ResourceDelta) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    ) {
        return;
    }
    for path in &event.paths {
        if let Some(resource) = content.to_resource_path(path) {
            delta.insert(&resource);
        }
    }
}
