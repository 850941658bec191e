//! # Document Model
//!
//! One open document: the root node, the selection, the undo history and
//! the view that mirrors them.
//!
//! Every edit goes through [`DocumentModel::execute_operation`]. After each
//! change the whole tree is revalidated, changed nodes are forwarded to the
//! view, the selection is pruned to nodes still in the tree and the dirty
//! flag is refreshed.
//!
//! ## Lifecycle
//!
//! ```text
//! open/set_root → edit (operations) → undo/redo → save
//!                       ↑
//!        handle_resource_changed (reference reload)
//! ```

use crate::context::{property_model, LoaderContext, NodePropertyModel};
use crate::errors::EditorError;
use crate::node::{ModelCore, NodeRef, WeakNodeRef};
use crate::operations::{AddChildOperation, ReferenceEditOperation, RemoveChildOperation};
use crate::reload::reload_changed;
use crate::undo_stack::{HistoryEvent, ListenerId, UndoStack};
use crate::validate::update_status;
use scened_common::normalize_resource_path;
use scened_properties::{Operation, PropertyDescriptor, PropertyValue, Status, ValueUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Receives everything a user interface needs to mirror a document.
/// All methods default to no-ops.
pub trait ModelView {
    fn set_root(&mut self, _root: &NodeRef) {}

    fn update_node(&mut self, _node: &NodeRef) {}

    fn update_selection(&mut self, _selection: &[NodeRef]) {}

    fn set_dirty(&mut self, _dirty: bool) {}
}

/// View that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl ModelView for NullView {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum number of undo steps (0 = unlimited)
    pub undo_levels: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { undo_levels: 100 }
    }
}

/// Set of resources that changed on disk, as normalized resource paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDelta {
    paths: BTreeSet<String>,
}

impl ResourceDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str) -> bool {
        self.paths.insert(normalize_resource_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize_resource_path(path))
    }

    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ResourceDelta {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut delta = ResourceDelta::new();
        for path in iter {
            delta.insert(path.as_ref());
        }
        delta
    }
}

/// Editing state of one document
pub struct DocumentModel {
    ctx: Rc<LoaderContext>,
    core: Rc<ModelCore>,
    root: Option<NodeRef>,

    /// Resource path the document is saved to, if file-backed
    path: Option<String>,

    selection: Vec<WeakNodeRef>,
    history: UndoStack,
    view: Box<dyn ModelView>,
    dirty: bool,
}

impl DocumentModel {
    /// Create an empty model without a root
    pub fn new(ctx: Rc<LoaderContext>, config: &EditorConfig) -> Self {
        Self {
            ctx,
            core: ModelCore::new(),
            root: None,
            path: None,
            selection: Vec::new(),
            history: UndoStack::with_max_levels(config.undo_levels),
            view: Box::new(NullView),
            dirty: false,
        }
    }

    /// Load the document at `path` and install it as root
    #[instrument(skip(ctx, config))]
    pub fn open(ctx: Rc<LoaderContext>, path: &str, config: &EditorConfig) -> Result<Self, EditorError> {
        let root = ctx.load_node(path)?;
        let mut model = Self::new(ctx, config);
        model.path = Some(normalize_resource_path(path));
        model.set_root(root);
        info!(path = %path, "Opened document");
        Ok(model)
    }

    /// Replace the view; the new view receives the current state
    pub fn set_view(&mut self, view: Box<dyn ModelView>) {
        self.view = view;
        if let Some(root) = &self.root {
            self.view.set_root(root);
            let selection = self.selection();
            self.view.update_selection(&selection);
        }
        self.view.set_dirty(self.dirty);
    }

    pub fn context(&self) -> &Rc<LoaderContext> {
        &self.ctx
    }

    pub fn root(&self) -> Option<&NodeRef> {
        self.root.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<&str>) {
        self.path = path.map(normalize_resource_path);
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Install a new root. The old tree is disposed and history cleared.
    pub fn set_root(&mut self, root: NodeRef) {
        if let Some(old) = self.root.take() {
            old.dispose();
        }
        self.history.clear();

        root.set_model(Some(&self.core));
        self.core.take_changes();
        update_status(&root, &self.ctx);

        self.selection = vec![root.downgrade()];
        self.view.set_root(&root);
        self.view.update_selection(std::slice::from_ref(&root));
        self.root = Some(root);

        self.dirty = false;
        self.view.set_dirty(false);
    }

    /// The single entry point for mutations
    pub fn execute_operation(&mut self, operation: Box<dyn Operation>) -> Result<(), EditorError> {
        let result = self.history.execute(operation);
        self.after_change();
        Ok(result?)
    }

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let result = self.history.undo();
        self.after_change();
        Ok(result?)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let result = self.history.redo();
        self.after_change();
        Ok(result?)
    }

    pub fn begin_batch(&mut self, label: impl Into<String>) {
        self.history.begin_batch(label);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
        self.after_change();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn add_history_listener(&mut self, listener: impl FnMut(&HistoryEvent) + 'static) -> ListenerId {
        self.history.add_listener(listener)
    }

    pub fn remove_history_listener(&mut self, id: ListenerId) -> bool {
        self.history.remove_listener(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
        self.refresh_dirty();
    }

    /// Write the document back to its file and mark it saved
    #[instrument(skip(self))]
    pub fn save(&mut self) -> Result<(), EditorError> {
        let path = self.path.clone().ok_or(EditorError::NotFileBacked)?;
        let root = self.root.as_ref().ok_or(EditorError::NoRoot)?;
        let text = self.ctx.build_node_text(root)?;
        self.ctx.file_system().write(&path, text.as_bytes())?;
        self.mark_saved();
        info!(path = %path, "Saved document");
        Ok(())
    }

    /// Selected nodes, in selection order
    pub fn selection(&self) -> Vec<NodeRef> {
        self.selection.iter().filter_map(WeakNodeRef::upgrade).collect()
    }

    /// Replace the selection. Nodes outside the tree and duplicates are
    /// dropped. Returns false when the selection did not change.
    pub fn set_selection(&mut self, nodes: &[NodeRef]) -> bool {
        let mut selection: Vec<NodeRef> = Vec::new();
        for node in nodes {
            if self.contains(node) && !selection.contains(node) {
                selection.push(node.clone());
            }
        }

        let current = self.selection();
        let unchanged = current.len() == selection.len() && selection.iter().all(|n| current.contains(n));
        if unchanged {
            return false;
        }

        self.selection = selection.iter().map(NodeRef::downgrade).collect();
        self.view.update_selection(&selection);
        true
    }

    /// Reload every reference backed by a changed resource.
    /// Returns whether anything was reloaded.
    #[instrument(skip_all, fields(changed = delta.len()))]
    pub fn handle_resource_changed(&mut self, delta: &ResourceDelta) -> bool {
        for path in delta.paths() {
            self.ctx.invalidate(path);
        }
        let Some(root) = self.root.clone() else {
            return false;
        };

        let reloaded = reload_changed(&root, &self.ctx, delta.paths());
        if reloaded {
            debug!("References reloaded");
            self.after_change();
        }
        reloaded
    }

    /// Cached status of the whole document
    pub fn status(&self) -> Status {
        self.root.as_ref().map(NodeRef::status).unwrap_or_default()
    }

    /// Revalidate the whole tree
    pub fn validate(&mut self) -> Status {
        match &self.root {
            Some(root) => update_status(root, &self.ctx),
            None => Status::ok(),
        }
    }

    /// Whether `node` belongs to the current tree
    pub fn contains(&self, node: &NodeRef) -> bool {
        self.root
            .as_ref()
            .is_some_and(|root| node.is_self_or_descendant_of(root))
    }

    // Property sheet

    fn property_model(&self, node: &NodeRef) -> Result<NodePropertyModel, EditorError> {
        if !self.contains(node) {
            return Err(EditorError::NotInDocument);
        }
        property_model(&self.ctx, node)
    }

    pub fn property_descriptors(&self, node: &NodeRef) -> Result<Vec<PropertyDescriptor>, EditorError> {
        Ok(self.property_model(node)?.descriptors())
    }

    pub fn property_value(&self, node: &NodeRef, property: &str) -> Result<PropertyValue, EditorError> {
        Ok(self.property_model(node)?.value(property)?)
    }

    /// Write a property through an undoable operation.
    /// Returns false when the value was already set.
    pub fn set_property_value(
        &mut self,
        node: &NodeRef,
        property: &str,
        update: impl Into<ValueUpdate>,
    ) -> Result<bool, EditorError> {
        match self.property_model(node)?.set(property, update)? {
            Some(operation) => {
                self.execute_operation(guard_overrides(node, operation))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove an override through an undoable operation.
    /// Returns false when the property was not overridden.
    pub fn reset_property_value(&mut self, node: &NodeRef, property: &str) -> Result<bool, EditorError> {
        match self.property_model(node)?.reset(property)? {
            Some(operation) => {
                self.execute_operation(guard_overrides(node, operation))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_property_editable(&self, node: &NodeRef, property: &str) -> bool {
        self.property_model(node).is_ok_and(|m| m.is_editable(property))
    }

    pub fn is_property_visible(&self, node: &NodeRef, property: &str) -> bool {
        self.property_model(node).is_ok_and(|m| m.is_visible(property))
    }

    pub fn is_property_overridden(&self, node: &NodeRef, property: &str) -> bool {
        self.property_model(node).is_ok_and(|m| m.is_overridden(property))
    }

    pub fn property_options(&self, node: &NodeRef, property: &str) -> Vec<String> {
        self.property_model(node)
            .map(|m| m.options(property))
            .unwrap_or_default()
    }

    pub fn property_status(&self, node: &NodeRef, property: &str) -> Status {
        self.property_model(node)
            .map(|m| m.property_status(property))
            .unwrap_or_default()
    }

    // Structure

    /// Add `child` under `parent` as one undo step
    pub fn add_node(&mut self, parent: &NodeRef, child: NodeRef) -> Result<(), EditorError> {
        if !self.contains(parent) {
            return Err(EditorError::NotInDocument);
        }
        self.execute_operation(Box::new(AddChildOperation::new(parent.clone(), child)))
    }

    /// Create a node from the template of `extension` and add it under `parent`
    pub fn add_node_from_template(&mut self, parent: &NodeRef, extension: &str) -> Result<NodeRef, EditorError> {
        let child = self.ctx.load_node_from_template(extension)?;
        self.add_node(parent, child.clone())?;
        Ok(child)
    }

    /// Remove `node` from its parent as one undo step. The root cannot be removed.
    pub fn remove_node(&mut self, node: &NodeRef) -> Result<(), EditorError> {
        let parent = node
            .parent()
            .filter(|_| self.contains(node))
            .ok_or(EditorError::NotInDocument)?;
        self.execute_operation(Box::new(RemoveChildOperation::new(parent, node.clone())))
    }

    fn after_change(&mut self) {
        let Some(root) = self.root.clone() else {
            return;
        };

        let before = self.selection.len();
        self.selection
            .retain(|w| w.upgrade().is_some_and(|n| n.is_self_or_descendant_of(&root)));
        if self.selection.len() != before {
            let selection = self.selection();
            self.view.update_selection(&selection);
        }

        update_status(&root, &self.ctx);
        for node in self.core.take_changes() {
            self.view.update_node(&node);
        }
        self.refresh_dirty();
    }

    fn refresh_dirty(&mut self) {
        let dirty = self.history.is_dirty();
        if dirty != self.dirty {
            self.dirty = dirty;
            self.view.set_dirty(dirty);
        }
    }
}

/// Edits of a reference node may reload it; keep its overrides undoable
fn guard_overrides(node: &NodeRef, operation: Box<dyn Operation>) -> Box<dyn Operation> {
    if node.borrow().kind().is_reference() {
        Box::new(ReferenceEditOperation::new(node.clone(), operation))
    } else {
        operation
    }
}

impl Drop for DocumentModel {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            root.dispose();
        }
    }
}

impl std::fmt::Debug for DocumentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentModel")
            .field("path", &self.path)
            .field("root", &self.root.as_ref().map(NodeRef::kind_name))
            .field("history", &self.history)
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeFlags;
    use scened_common::{FileSystem, MockFileSystem};

    fn document(fs: MockFileSystem, path: &str) -> DocumentModel {
        let ctx = Rc::new(LoaderContext::new(Rc::new(fs)).unwrap());
        DocumentModel::open(ctx, path, &EditorConfig::default()).unwrap()
    }

    fn scene() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/e.go", "components {\n  id: \"script\"\n  component: \"/e.script\"\n}\n");
        fs.add_file("/e.script", "go.property(\"speed\", 1)\n");
        fs.add_file(
            "/main.collection",
            "name: \"main\"\ninstances {\n  id: \"a\"\n  prototype: \"/e.go\"\n}\ninstances {\n  id: \"b\"\n  prototype: \"/e.go\"\n}\n",
        );
        fs
    }

    #[test]
    fn test_open_selects_root() {
        let doc = document(scene(), "/main.collection");
        let root = doc.root().unwrap().clone();
        assert_eq!(doc.selection(), vec![root]);
        assert!(!doc.is_dirty());
        assert!(doc.status().is_ok());
    }

    #[test]
    fn test_selection_dedupes_and_prunes() {
        let mut doc = document(scene(), "/main.collection");
        let root = doc.root().unwrap().clone();
        let a = root.find_child("a").unwrap();
        let b = root.find_child("b").unwrap();

        assert!(doc.set_selection(&[a.clone(), b.clone(), a.clone()]));
        assert_eq!(doc.selection(), vec![a.clone(), b.clone()]);
        assert!(!doc.set_selection(&[b.clone(), a.clone()]));

        doc.remove_node(&a).unwrap();
        assert_eq!(doc.selection(), vec![b.clone()]);

        let stranger = NodeRef::new(crate::node::NodeKind::Collection(Default::default()));
        assert!(!doc.set_selection(&[b, stranger]));
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let mut doc = document(scene(), "/main.collection");
        let root = doc.root().unwrap().clone();
        assert!(matches!(doc.remove_node(&root), Err(EditorError::NotInDocument)));
    }

    #[test]
    fn test_locked_children_are_read_only() {
        let mut doc = document(scene(), "/main.collection");
        let a = doc.root().unwrap().find_child("a").unwrap();
        let script = a.find_child("script").unwrap();
        assert!(script.has_flag(NodeFlags::LOCKED));
        assert!(!doc.is_property_editable(&script, "component"));
        assert!(doc.set_property_value(&script, "component", PropertyValue::Resource("/x.script".into())).is_err());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_save_writes_canonical_text() {
        let fs = Rc::new(scene());
        let ctx = Rc::new(LoaderContext::new(fs.clone()).unwrap());
        let mut doc = DocumentModel::open(ctx, "/main.collection", &EditorConfig::default()).unwrap();
        let a = doc.root().unwrap().find_child("a").unwrap();

        doc.set_property_value(&a, "position", ValueUpdate::Components([Some(2.0), None, None, None]))
            .unwrap();
        assert!(doc.is_dirty());
        doc.save().unwrap();
        assert!(!doc.is_dirty());

        let text = fs.read_to_string("/main.collection").unwrap();
        assert!(text.contains("x: 2.0"));
    }

    #[test]
    fn test_memory_document_cannot_save() {
        let ctx = Rc::new(LoaderContext::new(Rc::new(scene())).unwrap());
        let root = ctx.load_node("/main.collection").unwrap();
        let mut doc = DocumentModel::new(ctx, &EditorConfig::default());
        doc.set_root(root);
        assert!(matches!(doc.save(), Err(EditorError::NotFileBacked)));
    }

    #[test]
    fn test_config_defaults() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.undo_levels, 100);
        let config: EditorConfig = serde_json::from_str("{\"undoLevels\": 5}").unwrap();
        assert_eq!(config.undo_levels, 5);
    }

    #[test]
    fn test_resource_delta_normalizes() {
        let delta: ResourceDelta = ["main/a.go", "/main/a.go"].into_iter().collect();
        assert_eq!(delta.len(), 1);
        assert!(delta.contains("/main/a.go"));
    }
}
