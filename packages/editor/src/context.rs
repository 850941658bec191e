//! # Loader Context
//!
//! Shared services for loading and building documents: the content-root
//! file system, the node type registry, the property registry and a cache
//! of scanned script declarations.
//!
//! Loads are recursive (a collection loads the game objects it references),
//! so the context tracks the paths currently being loaded and fails a load
//! that would re-enter one of them with [`LoadError::Cycle`].

use crate::errors::{EditorError, LoadError};
use crate::node::NodeRef;
use crate::properties;
use crate::script::ScriptProperty;
use crate::types::{NodeType, NodeTypeRegistry, Progress};
use scened_common::{normalize_resource_path, resource_extension, FileSystem};
use scened_parser::{parse, serialize, Message};
use scened_properties::{ConfigurationError, PropertyModel, PropertyRegistry, ResourceWorld};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, instrument};

pub type NodeProperties = PropertyRegistry<NodeRef, LoaderContext>;
pub type NodePropertyModel = PropertyModel<NodeRef, LoaderContext>;

pub struct LoaderContext {
    fs: Rc<dyn FileSystem>,
    types: NodeTypeRegistry,
    properties: NodeProperties,
    scripts: RefCell<HashMap<String, Rc<Vec<ScriptProperty>>>>,
    loading: RefCell<Vec<String>>,
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("types", &self.types)
            .field("properties", &self.properties)
            .field("loading", &self.loading)
            .finish()
    }
}

/// Pops the loading stack when a load finishes, successfully or not
struct LoadingGuard<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl LoaderContext {
    /// Context with the built-in node types and property tables
    pub fn new(fs: Rc<dyn FileSystem>) -> Result<Self, ConfigurationError> {
        Ok(Self::with_registries(
            fs,
            NodeTypeRegistry::with_defaults(),
            properties::registry()?,
        ))
    }

    pub fn with_registries(
        fs: Rc<dyn FileSystem>,
        types: NodeTypeRegistry,
        properties: NodeProperties,
    ) -> Self {
        Self {
            fs,
            types,
            properties,
            scripts: RefCell::new(HashMap::new()),
            loading: RefCell::new(Vec::new()),
        }
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn node_type_registry(&self) -> &NodeTypeRegistry {
        &self.types
    }

    pub fn property_registry(&self) -> &NodeProperties {
        &self.properties
    }

    fn node_type(&self, extension: &str) -> Result<&NodeType, LoadError> {
        self.types
            .node_type(extension)
            .ok_or_else(|| LoadError::UnknownType(extension.to_string()))
    }

    /// Load the document at a resource path
    #[instrument(skip(self))]
    pub fn load_node(&self, path: &str) -> Result<NodeRef, LoadError> {
        let path = normalize_resource_path(path);
        let extension = resource_extension(&path)
            .ok_or_else(|| LoadError::UnknownType(path.clone()))?
            .to_string();
        self.node_type(&extension)?;

        if self.loading.borrow().contains(&path) {
            let mut chain = self.loading.borrow().clone();
            chain.push(path);
            return Err(LoadError::Cycle(chain));
        }
        if !self.fs.exists(&path) {
            return Err(LoadError::NotFound(path));
        }

        self.loading.borrow_mut().push(path.clone());
        let _guard = LoadingGuard {
            stack: &self.loading,
        };

        debug!(path = %path, "Loading node");
        let bytes = self.fs.read(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        self.load_text(&path, &extension, &bytes)
    }

    /// Load a document from its serialized form
    pub fn load_node_from_bytes(&self, extension: &str, bytes: &[u8]) -> Result<NodeRef, LoadError> {
        self.load_text(&format!("<{}>", extension), extension, bytes)
    }

    fn load_text(&self, path: &str, extension: &str, bytes: &[u8]) -> Result<NodeRef, LoadError> {
        let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        let message = parse(text).map_err(|source| LoadError::Parse {
            path: path.to_string(),
            source,
        })?;
        self.load_node_from_message(extension, &message)
    }

    pub fn load_node_from_message(&self, extension: &str, message: &Message) -> Result<NodeRef, LoadError> {
        let node_type = self.node_type(extension)?;
        node_type.loader.load(self, message)
    }

    /// Fresh document from the type's template
    pub fn load_node_from_template(&self, extension: &str) -> Result<NodeRef, LoadError> {
        let template = self.node_type(extension)?.template.clone();
        self.load_node_from_bytes(extension, template.as_bytes())
    }

    /// Serialize a document root back into its message
    #[instrument(skip(self, node, progress), fields(kind = node.kind_name()))]
    pub fn build_node_message(&self, node: &NodeRef, progress: &Progress) -> Result<Message, LoadError> {
        let kind = node.kind_name();
        let node_type = self
            .types
            .node_type_for_kind(kind)
            .ok_or_else(|| LoadError::UnknownType(kind.to_string()))?;
        progress.check()?;
        node_type.loader.build_message(self, node, progress)
    }

    /// Canonical text of a document
    pub fn build_node_text(&self, node: &NodeRef) -> Result<String, LoadError> {
        Ok(serialize(&self.build_node_message(node, &Progress::new())?))
    }

    /// Declarations of a script, scanned once and cached until invalidated
    pub fn load_script(&self, path: &str) -> Result<Rc<Vec<ScriptProperty>>, LoadError> {
        let path = normalize_resource_path(path);
        if let Some(cached) = self.scripts.borrow().get(&path) {
            return Ok(cached.clone());
        }
        if !self.fs.exists(&path) {
            return Err(LoadError::NotFound(path));
        }
        let source = self.fs.read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let declared = Rc::new(ScriptProperty::scan(&source));
        debug!(path = %path, count = declared.len(), "Scanned script");
        self.scripts.borrow_mut().insert(path, declared.clone());
        Ok(declared)
    }

    /// Forget cached data derived from a resource
    pub fn invalidate(&self, path: &str) {
        self.scripts.borrow_mut().remove(&normalize_resource_path(path));
    }
}

impl ResourceWorld for LoaderContext {
    fn resource_exists(&self, path: &str) -> bool {
        self.fs.exists(&normalize_resource_path(path))
    }
}

/// Property sheet of a node
pub fn property_model(ctx: &Rc<LoaderContext>, node: &NodeRef) -> Result<NodePropertyModel, EditorError> {
    let kind = node.kind_name();
    let properties = ctx
        .properties
        .kind(kind)
        .ok_or(EditorError::NoProperties(kind))?;
    Ok(PropertyModel::new(properties, node.clone(), ctx.clone()))
}
