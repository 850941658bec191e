use crate::watcher::FileWatcher;
use scened_common::{normalize_resource_path, FileSystem, RealFileSystem};
use scened_editor::{DocumentModel, EditorConfig, EditorError, LoaderContext, ResourceDelta};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Document is not open: {0}")]
    NotOpen(String),
}

/// What a resource change did to one open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentUpdate {
    /// References inside the document were reloaded
    Reloaded(String),

    /// The document's own file changed and it was read again
    Reopened(String),

    /// The document's own file changed but it has unsaved edits
    Conflict(String),
}

impl DocumentUpdate {
    pub fn path(&self) -> &str {
        match self {
            DocumentUpdate::Reloaded(path) | DocumentUpdate::Reopened(path) | DocumentUpdate::Conflict(path) => path,
        }
    }
}

/// The documents open on one content root, sharing a loader context
pub struct Workspace {
    ctx: Rc<LoaderContext>,
    config: EditorConfig,
    documents: BTreeMap<String, DocumentModel>,
}

impl Workspace {
    pub fn new(root: &Path, config: EditorConfig) -> Result<Self, WorkspaceError> {
        let fs = Rc::new(RealFileSystem::new(root));
        let ctx = LoaderContext::new(fs).map_err(EditorError::from)?;
        Ok(Self::with_context(Rc::new(ctx), config))
    }

    pub fn with_context(ctx: Rc<LoaderContext>, config: EditorConfig) -> Self {
        Self {
            ctx,
            config,
            documents: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &Rc<LoaderContext> {
        &self.ctx
    }

    /// Open a document, or return it if already open
    pub fn open(&mut self, path: &str) -> Result<&mut DocumentModel, WorkspaceError> {
        let path = normalize_resource_path(path);
        if !self.documents.contains_key(&path) {
            let document = DocumentModel::open(self.ctx.clone(), &path, &self.config)?;
            self.documents.insert(path.clone(), document);
        }
        self.document_mut(&path)
    }

    pub fn close(&mut self, path: &str) -> bool {
        self.documents.remove(&normalize_resource_path(path)).is_some()
    }

    pub fn document(&self, path: &str) -> Option<&DocumentModel> {
        self.documents.get(&normalize_resource_path(path))
    }

    pub fn document_mut(&mut self, path: &str) -> Result<&mut DocumentModel, WorkspaceError> {
        let path = normalize_resource_path(path);
        self.documents
            .get_mut(&path)
            .ok_or(WorkspaceError::NotOpen(path))
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &DocumentModel)> {
        self.documents.iter().map(|(path, doc)| (path.as_str(), doc))
    }

    /// Bring every open document up to date with `delta`
    pub fn apply_delta(&mut self, delta: &ResourceDelta) -> Vec<DocumentUpdate> {
        if delta.is_empty() {
            return Vec::new();
        }
        debug!(changed = delta.len(), "Applying resource changes");
        for path in delta.paths() {
            self.ctx.invalidate(path);
        }

        let mut updates = Vec::new();
        for (path, document) in self.documents.iter_mut() {
            if delta.contains(path) {
                updates.extend(reopen(&self.ctx, path, document));
            } else if document.handle_resource_changed(delta) {
                info!(path = %path, "Reloaded references");
                updates.push(DocumentUpdate::Reloaded(path.clone()));
            }
        }
        updates
    }

    /// Apply whatever the watcher has queued, without blocking
    pub fn poll(&mut self, watcher: &FileWatcher) -> Vec<DocumentUpdate> {
        let delta = watcher.try_delta();
        self.apply_delta(&delta)
    }
}

/// Read a document again after its own file changed. Nothing happens when
/// the file holds what the document would write, as after its own save.
fn reopen(ctx: &LoaderContext, path: &str, document: &mut DocumentModel) -> Option<DocumentUpdate> {
    if matches_disk(ctx, path, document) {
        debug!(path = %path, "Document already matches its file");
        return None;
    }
    if document.is_dirty() {
        warn!(path = %path, "Document changed on disk while it has unsaved edits");
        return Some(DocumentUpdate::Conflict(path.to_string()));
    }
    match ctx.load_node(path) {
        Ok(root) => {
            document.set_root(root);
            info!(path = %path, "Reopened document");
        }
        Err(err) => warn!(path = %path, error = %err, "Failed to reopen document"),
    }
    Some(DocumentUpdate::Reopened(path.to_string()))
}

fn matches_disk(ctx: &LoaderContext, path: &str, document: &DocumentModel) -> bool {
    let Some(root) = document.root() else {
        return false;
    };
    match (ctx.file_system().read_to_string(path), ctx.build_node_text(root)) {
        (Ok(on_disk), Ok(built)) => on_disk == built,
        _ => false,
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .finish()
    }
}
