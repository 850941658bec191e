use super::Validator;
use crate::status::{Severity, Status};
use crate::value::PropertyValue;

/// Fails with the configured severity when a text-like value is empty
#[derive(Debug, Clone, Copy)]
pub struct NotEmpty {
    pub severity: Severity,
}

impl NotEmpty {
    pub fn new(severity: Severity) -> Self {
        Self { severity }
    }
}

impl Default for NotEmpty {
    fn default() -> Self {
        Self::new(Severity::Error)
    }
}

impl<O, W> Validator<O, W> for NotEmpty {
    fn name(&self) -> &'static str {
        "not-empty"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, _world: &W) -> Status {
        match value.as_str() {
            Some(text) if text.trim().is_empty() => {
                Status::new(self.severity, format!("'{}' is not specified", property))
            }
            _ => Status::ok(),
        }
    }
}
