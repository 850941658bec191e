//! # scened Editor
//!
//! Document model of the scene editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: document text → Message             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: node tree + document model          │
//! │  - Loaders per node type (load/build)       │
//! │  - Reference reload of instanced documents  │
//! │  - Property sheet over scened-properties    │
//! │  - Undo history and validation              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ view: set_root / update_node / selection    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scened_editor::{DocumentModel, EditorConfig, LoaderContext};
//!
//! let ctx = Rc::new(LoaderContext::new(fs)?);
//! let mut doc = DocumentModel::open(ctx, "/main/level.collection", &EditorConfig::default())?;
//!
//! let hero = doc.root().unwrap().find_child("hero").unwrap();
//! doc.set_property_value(&hero, "position", ValueUpdate::Components([Some(5.0), None, None, None]))?;
//! doc.undo()?;
//!
//! doc.save()?;
//! ```

mod context;
mod document;
mod errors;
pub mod loaders;
pub mod node;
mod operations;
mod properties;
mod reload;
pub mod script;
mod types;
mod undo_stack;
mod validate;

pub use context::{property_model, LoaderContext, NodeProperties, NodePropertyModel};
pub use document::{DocumentModel, EditorConfig, ModelView, NullView, ResourceDelta};
pub use errors::{EditorError, LoadError};
pub use node::{
    kinds, ModelCore, NodeFlags, NodeKind, NodeRef, OverrideKey, Overrides, Transform, WeakNodeRef,
};
pub use operations::{AddChildOperation, ReferenceEditOperation, RemoveChildOperation};
pub use properties::registry;
pub use reload::{reload_changed, reload_component, reload_reference};
pub use types::{NodeLoader, NodeType, NodeTypeRegistry, Progress};
pub use undo_stack::{HistoryEvent, ListenerId, UndoStack};
pub use validate::update_status;

// Re-export the property system for convenience
pub use scened_properties::{
    Operation, PropertyDescriptor, PropertyValue, Severity, Status, ValueType, ValueUpdate,
};
