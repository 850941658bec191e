use crate::value::ValueType;
use serde::{Deserialize, Serialize};

/// Which property-sheet editor presents a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorKind {
    Default,
    Dropdown,
    Resource,
}

impl From<ValueType> for EditorKind {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Enum => EditorKind::Dropdown,
            ValueType::Resource => EditorKind::Resource,
            _ => EditorKind::Default,
        }
    }
}

/// Static metadata for one editable property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub editor: EditorKind,
    pub value_type: ValueType,

    /// Inclusive numeric bounds, for number-like properties
    pub range: Option<(f64, f64)>,

    /// Accepted file extensions, for resource properties
    pub extensions: Vec<String>,
}

impl PropertyDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: String::new(),
            editor: value_type.into(),
            value_type,
            range: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}
