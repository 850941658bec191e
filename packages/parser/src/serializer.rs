use crate::message::{FieldValue, Message};
use crate::tokenizer::escape;

/// Serializer converts a message back to text
///
/// Output is canonical: one field per line, nested messages opened with
/// `name {` and closed on their own line, floats always written with a
/// decimal point or exponent so they re-parse as floats. Comments and
/// original whitespace are not preserved.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a message to text
    pub fn serialize(&mut self, message: &Message) -> String {
        let mut output = String::new();
        self.serialize_fields(message, &mut output);
        output
    }

    fn serialize_fields(&mut self, message: &Message, output: &mut String) {
        for field in &message.fields {
            self.write_indent(output);
            output.push_str(&field.name);

            match &field.value {
                FieldValue::Message(nested) => {
                    output.push_str(" {\n");
                    self.indent_level += 1;
                    self.serialize_fields(nested, output);
                    self.indent_level -= 1;
                    self.write_indent(output);
                    output.push_str("}\n");
                }
                scalar => {
                    output.push_str(": ");
                    output.push_str(&format_scalar(scalar));
                    output.push('\n');
                }
            }
        }
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_scalar(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => escape(s),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) => format_float(*f),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Ident(s) => s.clone(),
        FieldValue::Message(_) => unreachable!("nested messages are written by serialize_fields"),
    }
}

fn format_float(value: f64) -> String {
    if !value.is_finite() {
        // Not representable in the format; written as zero
        return "0.0".to_string();
    }
    // Debug formatting is the shortest representation that round-trips
    let text = format!("{:?}", value);
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Serialize a message with the default two-space indentation
pub fn serialize(message: &Message) -> String {
    Serializer::new().serialize(message)
}
