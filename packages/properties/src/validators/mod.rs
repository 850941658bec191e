//! Property validators.
//!
//! Each validator is a pure check of one property value. Every validator
//! attached to a property is run; their results are combined with
//! [`Status::merge`](crate::Status::merge).

mod not_empty;
mod numeric;
mod resource;

pub use not_empty::NotEmpty;
pub use numeric::{GreaterEqualThanZero, GreaterThanZero, NotZero, Range};
pub use resource::{ResourceExists, ResourceWorld};

use crate::status::Status;
use crate::value::PropertyValue;

/// Trait for implementing property validators
pub trait Validator<O, W> {
    /// Unique identifier for this validator
    fn name(&self) -> &'static str;

    /// Check `value` of `property` on `object`
    fn validate(&self, object: &O, property: &str, value: &PropertyValue, world: &W) -> Status;
}

/// Run every validator and merge the results
pub fn validate_all<O, W>(
    validators: &[std::rc::Rc<dyn Validator<O, W>>],
    object: &O,
    property: &str,
    value: &PropertyValue,
    world: &W,
) -> Status {
    Status::merge(
        validators
            .iter()
            .map(|v| v.validate(object, property, value, world))
            .map(|s| if s.is_ok() { s } else { s.with_property(property) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Severity;
    use std::rc::Rc;

    #[test]
    fn test_all_validators_run() {
        let validators: Vec<Rc<dyn Validator<(), ()>>> =
            vec![Rc::new(NotZero), Rc::new(GreaterThanZero)];
        let status = validate_all(&validators, &(), "speed", &PropertyValue::Number(0.0), &());

        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.messages().len(), 2);
        assert_eq!(status.for_property("speed").len(), 2);
    }

    #[test]
    fn test_not_zero_and_greater_equal_at_zero() {
        let validators: Vec<Rc<dyn Validator<(), ()>>> =
            vec![Rc::new(NotZero), Rc::new(GreaterEqualThanZero)];
        let status = validate_all(&validators, &(), "speed", &PropertyValue::Number(0.0), &());

        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.messages(), vec!["'speed' must not be zero"]);

        let negative = validate_all(&validators, &(), "speed", &PropertyValue::Number(-1.0), &());
        assert_eq!(negative.messages(), vec!["'speed' must not be negative"]);
    }
}
