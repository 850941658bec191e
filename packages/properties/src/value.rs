//! Property values and partial updates.
//!
//! Composite values (vectors, quaternions, colors) can be written one
//! component at a time. [`merge`] folds a [`ValueUpdate`] into the current
//! value, dispatching on the runtime type of the current value.

use crate::error::PropertyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Text,
    Number,
    Integer,
    Bool,
    Vector2,
    Vector3,
    Vector4,
    Quat,
    Color,
    Enum,
    Resource,
}

impl ValueType {
    /// Number of numeric components, zero for scalar and text types
    pub fn component_count(self) -> usize {
        match self {
            ValueType::Vector2 => 2,
            ValueType::Vector3 => 3,
            ValueType::Vector4 | ValueType::Quat | ValueType::Color => 4,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Vector2([f64; 2]),
    Vector3([f64; 3]),
    Vector4([f64; 4]),
    Quat([f64; 4]),
    /// RGBA
    Color([f64; 4]),
    Enum(String),
    Resource(String),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Text(_) => ValueType::Text,
            PropertyValue::Number(_) => ValueType::Number,
            PropertyValue::Integer(_) => ValueType::Integer,
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Vector2(_) => ValueType::Vector2,
            PropertyValue::Vector3(_) => ValueType::Vector3,
            PropertyValue::Vector4(_) => ValueType::Vector4,
            PropertyValue::Quat(_) => ValueType::Quat,
            PropertyValue::Color(_) => ValueType::Color,
            PropertyValue::Enum(_) => ValueType::Enum,
            PropertyValue::Resource(_) => ValueType::Resource,
        }
    }

    /// Zero/empty value of a type
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Text => PropertyValue::Text(String::new()),
            ValueType::Number => PropertyValue::Number(0.0),
            ValueType::Integer => PropertyValue::Integer(0),
            ValueType::Bool => PropertyValue::Bool(false),
            ValueType::Vector2 => PropertyValue::Vector2([0.0; 2]),
            ValueType::Vector3 => PropertyValue::Vector3([0.0; 3]),
            ValueType::Vector4 => PropertyValue::Vector4([0.0; 4]),
            ValueType::Quat => PropertyValue::Quat([0.0, 0.0, 0.0, 1.0]),
            ValueType::Color => PropertyValue::Color([1.0; 4]),
            ValueType::Enum => PropertyValue::Enum(String::new()),
            ValueType::Resource => PropertyValue::Resource(String::new()),
        }
    }

    /// Numeric components of composite values, or the single number of a scalar
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            PropertyValue::Number(n) => Some(vec![*n]),
            PropertyValue::Integer(i) => Some(vec![*i as f64]),
            PropertyValue::Vector2(v) => Some(v.to_vec()),
            PropertyValue::Vector3(v) => Some(v.to_vec()),
            PropertyValue::Vector4(v) | PropertyValue::Quat(v) | PropertyValue::Color(v) => {
                Some(v.to_vec())
            }
            _ => None,
        }
    }

    /// Text of string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) | PropertyValue::Enum(s) | PropertyValue::Resource(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self {
            PropertyValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    /// Compact text form, as stored in override tables
    pub fn to_text(&self) -> String {
        match self {
            PropertyValue::Text(s) | PropertyValue::Enum(s) | PropertyValue::Resource(s) => {
                s.clone()
            }
            PropertyValue::Number(n) => format_number(*n),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            other => other
                .components()
                .unwrap_or_default()
                .into_iter()
                .map(format_number)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Parse the text form of a value of the given type
    pub fn parse_text(value_type: ValueType, text: &str) -> Result<Self, PropertyError> {
        let invalid = || PropertyError::InvalidText {
            value_type,
            text: text.to_string(),
        };
        let trimmed = text.trim();

        match value_type {
            ValueType::Text => Ok(PropertyValue::Text(text.to_string())),
            ValueType::Enum => Ok(PropertyValue::Enum(trimmed.to_string())),
            ValueType::Resource => Ok(PropertyValue::Resource(trimmed.to_string())),
            ValueType::Number => trimmed
                .parse::<f64>()
                .map(PropertyValue::Number)
                .map_err(|_| invalid()),
            ValueType::Integer => trimmed
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|_| invalid()),
            ValueType::Bool => match trimmed {
                "true" | "1" => Ok(PropertyValue::Bool(true)),
                "false" | "0" => Ok(PropertyValue::Bool(false)),
                _ => Err(invalid()),
            },
            composite => {
                let parts = trimmed
                    .split(',')
                    .map(|part| part.trim().parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| invalid())?;
                if parts.len() != composite.component_count() {
                    return Err(invalid());
                }
                Ok(from_components(composite, &parts))
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn from_components(value_type: ValueType, c: &[f64]) -> PropertyValue {
    match value_type {
        ValueType::Vector2 => PropertyValue::Vector2([c[0], c[1]]),
        ValueType::Vector3 => PropertyValue::Vector3([c[0], c[1], c[2]]),
        ValueType::Vector4 => PropertyValue::Vector4([c[0], c[1], c[2], c[3]]),
        ValueType::Quat => PropertyValue::Quat([c[0], c[1], c[2], c[3]]),
        _ => PropertyValue::Color([c[0], c[1], c[2], c[3]]),
    }
}

/// A write to a property: a whole value, or a patch of individual components
#[derive(Debug, Clone, PartialEq)]
pub enum ValueUpdate {
    Value(PropertyValue),
    Components([Option<f64>; 4]),
}

impl ValueUpdate {
    pub fn component(index: usize, value: f64) -> Self {
        let mut parts = [None; 4];
        if let Some(slot) = parts.get_mut(index) {
            *slot = Some(value);
        }
        ValueUpdate::Components(parts)
    }

    pub fn x(value: f64) -> Self {
        Self::component(0, value)
    }

    pub fn y(value: f64) -> Self {
        Self::component(1, value)
    }

    pub fn z(value: f64) -> Self {
        Self::component(2, value)
    }

    pub fn w(value: f64) -> Self {
        Self::component(3, value)
    }
}

impl From<PropertyValue> for ValueUpdate {
    fn from(value: PropertyValue) -> Self {
        ValueUpdate::Value(value)
    }
}

/// Fold an update into the current value of property `id`.
///
/// Whole values must match the current type, except that integers are
/// accepted for number properties. Component patches only apply to
/// composite values and leave untouched components as they were.
pub fn merge(
    id: &str,
    current: &PropertyValue,
    update: &ValueUpdate,
) -> Result<PropertyValue, PropertyError> {
    let expected = current.value_type();
    match update {
        ValueUpdate::Value(value) => match (expected, value) {
            (ValueType::Number, PropertyValue::Integer(i)) => Ok(PropertyValue::Number(*i as f64)),
            _ if value.value_type() == expected => Ok(value.clone()),
            _ => Err(PropertyError::TypeMismatch {
                property: id.to_string(),
                expected,
                found: value.value_type(),
            }),
        },
        ValueUpdate::Components(parts) => {
            let count = expected.component_count();
            let mut components = match current.components() {
                Some(components) if count > 0 => components,
                _ => {
                    return Err(PropertyError::NoSuchComponent {
                        value_type: expected,
                        index: first_set(parts).unwrap_or(0),
                    })
                }
            };
            for (index, part) in parts.iter().enumerate() {
                if let Some(value) = part {
                    if index >= count {
                        return Err(PropertyError::NoSuchComponent {
                            value_type: expected,
                            index,
                        });
                    }
                    components[index] = *value;
                }
            }
            Ok(from_components(expected, &components))
        }
    }
}

fn first_set(parts: &[Option<f64>; 4]) -> Option<usize> {
    parts.iter().position(Option::is_some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_keeps_other_components() {
        let current = PropertyValue::Vector3([1.0, 2.0, 3.0]);
        let merged = merge("position", &current, &ValueUpdate::x(5.0)).unwrap();
        assert_eq!(merged, PropertyValue::Vector3([5.0, 2.0, 3.0]));
    }

    #[test]
    fn test_partial_update_out_of_range() {
        let current = PropertyValue::Vector2([1.0, 2.0]);
        let err = merge("size", &current, &ValueUpdate::z(1.0)).unwrap_err();
        assert_eq!(
            err,
            PropertyError::NoSuchComponent {
                value_type: ValueType::Vector2,
                index: 2
            }
        );

        let scalar = PropertyValue::Number(1.0);
        assert!(merge("speed", &scalar, &ValueUpdate::x(2.0)).is_err());
    }

    #[test]
    fn test_whole_value_type_checked() {
        let current = PropertyValue::Number(1.0);
        assert_eq!(
            merge("speed", &current, &PropertyValue::Integer(3).into()).unwrap(),
            PropertyValue::Number(3.0)
        );
        let err = merge("speed", &current, &PropertyValue::Bool(true).into()).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(PropertyValue::Number(10.0).to_text(), "10");
        assert_eq!(PropertyValue::Number(0.5).to_text(), "0.5");
        assert_eq!(PropertyValue::Vector3([1.0, 0.5, -2.0]).to_text(), "1, 0.5, -2");

        assert_eq!(
            PropertyValue::parse_text(ValueType::Number, "10").unwrap(),
            PropertyValue::Number(10.0)
        );
        assert_eq!(
            PropertyValue::parse_text(ValueType::Vector3, "1, 0.5, -2").unwrap(),
            PropertyValue::Vector3([1.0, 0.5, -2.0])
        );
        assert!(PropertyValue::parse_text(ValueType::Vector3, "1, 2").is_err());
        assert!(PropertyValue::parse_text(ValueType::Bool, "maybe").is_err());
    }
}
