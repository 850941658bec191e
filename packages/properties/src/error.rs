//! Error types for property access, operations and kind registration

use crate::value::ValueType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Type mismatch for '{property}': expected {expected:?}, found {found:?}")]
    TypeMismatch {
        property: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Value of type {value_type:?} has no component {index}")]
    NoSuchComponent { value_type: ValueType, index: usize },

    #[error("Property '{0}' is not editable")]
    NotEditable(String),

    #[error("Invalid value '{text}' for {value_type:?}")]
    InvalidText { value_type: ValueType, text: String },

    #[error("Property '{property}' could not be written: {message}")]
    WriteFailed { property: String, message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Operation '{label}' failed: {source}")]
    Property {
        label: String,
        #[source]
        source: PropertyError,
    },

    #[error("Operation '{label}' failed: {message}")]
    Failed { label: String, message: String },

    #[error("Operation '{0}' cannot be undone before it is executed")]
    NotExecuted(String),
}

impl OperationError {
    pub fn property(label: impl Into<String>, source: PropertyError) -> Self {
        Self::Property {
            label: label.into(),
            source,
        }
    }

    pub fn failed(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// Raised while registering a node kind. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Kind '{0}' is registered twice")]
    DuplicateKind(String),

    #[error("Kind '{kind}' declares property '{property}' twice")]
    DuplicateProperty { kind: String, property: String },

    #[error("Kind '{kind}' declares more than one {capability}")]
    DuplicateCapability {
        kind: String,
        capability: &'static str,
    },

    #[error("Kind '{0}' provides dynamic properties without a dynamic accessor")]
    MissingDynamicAccessor(String),

    #[error("Property '{property}' of kind '{kind}' has no getter")]
    MissingGetter { kind: String, property: String },
}
