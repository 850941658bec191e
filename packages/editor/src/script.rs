//! Script property declarations.
//!
//! Scripts declare editable properties with lines such as
//! `go.property("speed", 10)` or `go.property("dir", vmath.vector3(0, 1, 0))`.
//! The declared name, type and default become the dynamic properties of
//! every component referencing the script.

use regex::Regex;
use scened_properties::{PropertyValue, ValueType};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptProperty {
    pub name: String,
    pub value_type: ValueType,
    pub default: PropertyValue,
}

fn declaration() -> &'static Regex {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    DECLARATION.get_or_init(|| {
        Regex::new(r#"(?m)^\s*go\.property\(\s*"([^"]*)"\s*,\s*(.*)\)\s*;?\s*$"#)
            .expect("declaration pattern is valid")
    })
}

impl ScriptProperty {
    /// Every valid declaration in `source`, in order. Malformed ones are skipped.
    pub fn scan(source: &str) -> Vec<ScriptProperty> {
        declaration()
            .captures_iter(source)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                let default = parse_default(caps.get(2)?.as_str())?;
                (!name.is_empty()).then(|| ScriptProperty {
                    name: name.to_string(),
                    value_type: default.value_type(),
                    default,
                })
            })
            .collect()
    }
}

fn parse_default(expression: &str) -> Option<PropertyValue> {
    let expression = expression.trim();
    match expression {
        "true" => return Some(PropertyValue::Bool(true)),
        "false" => return Some(PropertyValue::Bool(false)),
        _ => {}
    }
    if let Ok(n) = expression.parse::<f64>() {
        return Some(PropertyValue::Number(n));
    }

    let (function, args) = call(expression)?;
    match function {
        "vmath.vector3" => numbers::<3>(args, 0.0).map(PropertyValue::Vector3),
        "vmath.vector4" => numbers::<4>(args, 0.0).map(PropertyValue::Vector4),
        "vmath.quat" => {
            if args.trim().is_empty() {
                Some(PropertyValue::Quat([0.0, 0.0, 0.0, 1.0]))
            } else {
                numbers::<4>(args, 0.0).map(PropertyValue::Quat)
            }
        }
        "hash" => quoted(args).map(PropertyValue::Text),
        "msg.url" => Some(PropertyValue::Text(quoted(args).unwrap_or_default())),
        _ => None,
    }
}

/// Split `name(args)`
fn call(expression: &str) -> Option<(&str, &str)> {
    let open = expression.find('(')?;
    let inner = expression[open + 1..].strip_suffix(')')?;
    Some((expression[..open].trim(), inner))
}

/// No arguments gives `empty` everywhere; a single argument fills every component
fn numbers<const N: usize>(args: &str, empty: f64) -> Option<[f64; N]> {
    if args.trim().is_empty() {
        return Some([empty; N]);
    }
    let values = args
        .split(',')
        .map(|a| a.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match values.len() {
        1 => Some([values[0]; N]),
        n if n == N => values.try_into().ok(),
        _ => None,
    }
}

fn quoted(args: &str) -> Option<String> {
    let args = args.trim();
    args.strip_prefix('"')?
        .strip_suffix('"')
        .map(str::to_string)
}

/// Type name written to component property blocks
pub fn type_name(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Text | ValueType::Enum | ValueType::Resource => "PROPERTY_TYPE_HASH",
        ValueType::Vector3 => "PROPERTY_TYPE_VECTOR3",
        ValueType::Vector2 | ValueType::Vector4 | ValueType::Color => "PROPERTY_TYPE_VECTOR4",
        ValueType::Quat => "PROPERTY_TYPE_QUAT",
        ValueType::Bool => "PROPERTY_TYPE_BOOLEAN",
        ValueType::Number | ValueType::Integer => "PROPERTY_TYPE_NUMBER",
    }
}

/// Inverse of [`type_name`]; unknown names are numbers
pub fn value_type_of(name: &str) -> ValueType {
    match name {
        "PROPERTY_TYPE_HASH" | "PROPERTY_TYPE_URL" => ValueType::Text,
        "PROPERTY_TYPE_VECTOR3" => ValueType::Vector3,
        "PROPERTY_TYPE_VECTOR4" => ValueType::Vector4,
        "PROPERTY_TYPE_QUAT" => ValueType::Quat,
        "PROPERTY_TYPE_BOOLEAN" => ValueType::Bool,
        _ => ValueType::Number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_declarations() {
        let source = r#"
go.property("speed", 10)
go.property("enabled", true)
  go.property("dir", vmath.vector3(0, 1, 0));
go.property("tint", vmath.vector4())
go.property("turn", vmath.quat())
go.property("target", hash("player"))

function update(self, dt)
end
"#;
        let props = ScriptProperty::scan(source);
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["speed", "enabled", "dir", "tint", "turn", "target"]);

        assert_eq!(props[0].default, PropertyValue::Number(10.0));
        assert_eq!(props[1].default, PropertyValue::Bool(true));
        assert_eq!(props[2].default, PropertyValue::Vector3([0.0, 1.0, 0.0]));
        assert_eq!(props[3].default, PropertyValue::Vector4([0.0; 4]));
        assert_eq!(props[4].default, PropertyValue::Quat([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(props[5].value_type, ValueType::Text);
    }

    #[test]
    fn test_invalid_declarations_are_skipped() {
        let source = "go.property(\"\", 1)\ngo.property(\"bad\", vmath.vector3(1, 2))\ngo.property(\"ok\", -2.5)\n";
        let props = ScriptProperty::scan(source);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].default, PropertyValue::Number(-2.5));
    }

    #[test]
    fn test_type_names() {
        for value_type in [ValueType::Number, ValueType::Text, ValueType::Vector3, ValueType::Quat, ValueType::Bool] {
            assert_eq!(value_type_of(type_name(value_type)), value_type);
        }
        assert_eq!(value_type_of("PROPERTY_TYPE_WHATEVER"), ValueType::Number);
    }
}
