//! # scened Workspace
//!
//! Keeps the documents open on a content root in step with the disk. A
//! [`FileWatcher`] turns file system events into resource deltas; the
//! [`Workspace`] applies them to every open document.

pub mod watcher;
pub mod workspace;

pub use watcher::{FileWatcher, WatcherError, WatcherResult};
pub use workspace::{DocumentUpdate, Workspace, WorkspaceError};
