//! In-memory representation of a text-format message.
//!
//! A message is an ordered list of named fields. Field names may repeat
//! (repeated fields), and values are scalars or nested messages:
//!
//! ```text
//! name: "level"
//! instances {
//!   id: "go1"
//!   position {
//!     x: 0.0
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Value of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Bare identifier, used for enum values
    Ident(String),
    Message(Message),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Booleans are accepted as `true`/`false` or as `0`/`1`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(0) => Some(false),
            FieldValue::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            FieldValue::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            FieldValue::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// A named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Ordered collection of fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub fields: Vec<Field>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First value of a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// All values of a (repeated) field, in order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn get_ident(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_ident)
    }

    pub fn get_message(&self, name: &str) -> Option<&Message> {
        self.get(name).and_then(FieldValue::as_message)
    }

    /// Every string value of a repeated field
    pub fn strings<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.get_all(name).filter_map(FieldValue::as_str)
    }

    /// Every nested message of a repeated field
    pub fn messages<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.get_all(name).filter_map(FieldValue::as_message)
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
    }

    pub fn push_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.push(name, FieldValue::Str(value.into()));
    }

    pub fn push_f64(&mut self, name: impl Into<String>, value: f64) {
        self.push(name, FieldValue::Float(value));
    }

    pub fn push_i64(&mut self, name: impl Into<String>, value: i64) {
        self.push(name, FieldValue::Int(value));
    }

    pub fn push_bool(&mut self, name: impl Into<String>, value: bool) {
        self.push(name, FieldValue::Bool(value));
    }

    pub fn push_ident(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.push(name, FieldValue::Ident(value.into()));
    }

    pub fn push_message(&mut self, name: impl Into<String>, value: Message) {
        self.push(name, FieldValue::Message(value));
    }

    /// Builder-style variant of [`Message::push_str`]
    pub fn with_str(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_str(name, value);
        self
    }

    pub fn with_f64(mut self, name: impl Into<String>, value: f64) -> Self {
        self.push_f64(name, value);
        self
    }

    pub fn with_message(mut self, name: impl Into<String>, value: Message) -> Self {
        self.push_message(name, value);
        self
    }
}
