//! # scened-properties
//!
//! Declarative property system for document nodes.
//!
//! - [`PropertyRegistry`] holds one frozen property table per node kind
//! - [`PropertyAccessor`] is the single read/write path for a kind's values
//! - [`validators`] check values and report a [`Status`]
//! - [`CommandFactory`] turns edits into undoable [`Operation`]s
//! - [`PropertyModel`] is the property-sheet surface over one object
//!
//! The crate is generic over the object type `O` (usually a cheap handle)
//! and the world type `W` handed to accessors and validators.

pub mod accessor;
pub mod command;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod registry;
pub mod status;
pub mod validators;
pub mod value;

pub use accessor::PropertyAccessor;
pub use command::{
    CommandFactory, CompositeOperation, Operation, ResetPropertyOperation, SetPropertyOperation,
};
pub use descriptor::{EditorKind, PropertyDescriptor};
pub use error::{ConfigurationError, OperationError, PropertyError};
pub use model::PropertyModel;
pub use registry::{DynamicProperties, DynamicValidators, KindBuilder, KindProperties, PropertyDef, PropertyRegistry};
pub use status::{Severity, Status};
pub use validators::{
    GreaterEqualThanZero, GreaterThanZero, NotEmpty, NotZero, Range, ResourceExists, ResourceWorld,
    Validator,
};
pub use value::{merge, PropertyValue, ValueType, ValueUpdate};
