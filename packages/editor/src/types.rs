//! Node type registry.
//!
//! Maps a document extension to the node kind it loads as, the loader that
//! reads and writes it, and the template used for new documents.

use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::loaders;
use crate::node::{kinds, NodeRef};
use indexmap::IndexMap;
use scened_parser::Message;
use scened_properties::ConfigurationError;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reads a message into a node tree and writes it back
pub trait NodeLoader {
    fn load(&self, ctx: &LoaderContext, message: &Message) -> Result<NodeRef, LoadError>;

    /// Inverse of `load` for every semantic field
    fn build_message(
        &self,
        ctx: &LoaderContext,
        node: &NodeRef,
        progress: &Progress,
    ) -> Result<Message, LoadError>;
}

#[derive(Clone)]
pub struct NodeType {
    pub extension: String,
    pub kind: &'static str,
    pub display_name: String,
    pub loader: Rc<dyn NodeLoader>,
    pub template: String,
    /// Kinds that reference nodes inside documents of this type may load
    pub reference_kinds: Vec<&'static str>,
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeType")
            .field("extension", &self.extension)
            .field("kind", &self.kind)
            .field("display_name", &self.display_name)
            .field("reference_kinds", &self.reference_kinds)
            .finish()
    }
}

/// Registry of every document type, keyed by extension
#[derive(Debug, Default)]
pub struct NodeTypeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in document types
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for node_type in loaders::default_types() {
            // Built-in extensions are distinct
            let _ = registry.register(node_type);
        }
        registry
    }

    pub fn register(&mut self, node_type: NodeType) -> Result<(), ConfigurationError> {
        if self.types.contains_key(&node_type.extension) {
            return Err(ConfigurationError::DuplicateKind(node_type.extension));
        }
        self.types.insert(node_type.extension.clone(), node_type);
        Ok(())
    }

    pub fn node_type(&self, extension: &str) -> Option<&NodeType> {
        self.types.get(extension)
    }

    /// Document type whose root has the given kind
    pub fn node_type_for_kind(&self, kind: &str) -> Option<&NodeType> {
        self.types.values().find(|t| t.kind == kind)
    }

    /// Replace the template of a registered type. Returns false for unknown extensions.
    pub fn set_template(&mut self, extension: &str, template: impl Into<String>) -> bool {
        match self.types.get_mut(extension) {
            Some(node_type) => {
                node_type.template = template.into();
                true
            }
            None => false,
        }
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Whether documents whose root is `container` may reference documents of `target` kind
    pub fn allows_reference(&self, container: &str, target: &str) -> bool {
        match self.node_type_for_kind(container) {
            Some(node_type) => node_type.reference_kinds.contains(&target),
            None => true,
        }
    }
}

/// Progress and cooperative cancellation of a build
#[derive(Debug, Default)]
pub struct Progress {
    cancel: Arc<AtomicBool>,
    worked: Cell<usize>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress sharing an existing cancellation flag
    pub fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            worked: Cell::new(0),
        }
    }

    /// Flag another thread may set to cancel the build
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Number of nodes built so far
    pub fn worked(&self) -> usize {
        self.worked.get()
    }

    /// Record one unit of work, failing when cancelled
    pub fn check(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        self.worked.set(self.worked.get() + 1);
        Ok(())
    }
}
