use super::Validator;
use crate::status::Status;
use crate::value::PropertyValue;

/// True when every numeric component satisfies `check`. Non-numeric values pass.
fn all_components(value: &PropertyValue, check: impl Fn(f64) -> bool) -> bool {
    value
        .components()
        .map(|components| components.into_iter().all(check))
        .unwrap_or(true)
}

/// Inclusive bounds
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl<O, W> Validator<O, W> for Range {
    fn name(&self) -> &'static str {
        "range"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, _world: &W) -> Status {
        if all_components(value, |c| c >= self.min && c <= self.max) {
            Status::ok()
        } else {
            Status::error(format!(
                "'{}' must be between {} and {}",
                property, self.min, self.max
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreaterThanZero;

impl<O, W> Validator<O, W> for GreaterThanZero {
    fn name(&self) -> &'static str {
        "greater-than-zero"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, _world: &W) -> Status {
        if all_components(value, |c| c > 0.0) {
            Status::ok()
        } else {
            Status::error(format!("'{}' must be greater than zero", property))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreaterEqualThanZero;

impl<O, W> Validator<O, W> for GreaterEqualThanZero {
    fn name(&self) -> &'static str {
        "greater-equal-than-zero"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, _world: &W) -> Status {
        if all_components(value, |c| c >= 0.0) {
            Status::ok()
        } else {
            Status::error(format!("'{}' must not be negative", property))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotZero;

impl<O, W> Validator<O, W> for NotZero {
    fn name(&self) -> &'static str {
        "not-zero"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, _world: &W) -> Status {
        if all_components(value, |c| c != 0.0) {
            Status::ok()
        } else {
            Status::error(format!("'{}' must not be zero", property))
        }
    }
}
