//! Error types for the editor

use scened_parser::ParseError;
use scened_properties::{ConfigurationError, OperationError, PropertyError};
use thiserror::Error;

/// Failure to materialize or build a document.
///
/// Caught at reference nodes and turned into an invalid-reference status,
/// so a broken reference never makes the rest of a document unusable.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource '{0}' does not exist")]
    NotFound(String),

    #[error("Parse error in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("No node type registered for '{0}'")]
    UnknownType(String),

    #[error("Missing field '{field}' in {context}")]
    MissingField { context: String, field: String },

    #[error("Invalid '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("'{path}' is a {found}, expected {expected}")]
    WrongKind {
        path: String,
        found: &'static str,
        expected: String,
    },

    #[error("Reference cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("Build cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn missing_field(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node kind '{0}' has no properties")]
    NoProperties(&'static str),

    #[error("Node is not part of this document")]
    NotInDocument,

    #[error("Document has no root")]
    NoRoot,

    #[error("Document is not file-backed")]
    NotFileBacked,
}
