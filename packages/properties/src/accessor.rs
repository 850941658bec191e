use crate::error::PropertyError;
use crate::value::{PropertyValue, ValueUpdate};

/// Read/write path for the properties of one node kind.
///
/// Accessors hold no per-object state; the object and the world are passed
/// to every call. `set_value` merges partial updates into the current value.
pub trait PropertyAccessor<O, W> {
    fn get_value(&self, object: &O, property: &str, world: &W) -> Result<PropertyValue, PropertyError>;

    fn set_value(
        &self,
        object: &O,
        property: &str,
        update: &ValueUpdate,
        world: &W,
    ) -> Result<(), PropertyError>;

    fn is_editable(&self, _object: &O, _property: &str, _world: &W) -> bool {
        true
    }

    fn is_visible(&self, _object: &O, _property: &str, _world: &W) -> bool {
        true
    }

    /// Whether the value shadows an inherited default
    fn is_overridden(&self, _object: &O, _property: &str, _world: &W) -> bool {
        false
    }

    /// Drop the override so the inherited default applies again
    fn reset_value(&self, object: &O, property: &str, world: &W) -> Result<(), PropertyError>;

    /// Choices offered for dropdown properties
    fn property_options(&self, _object: &O, _property: &str, _world: &W) -> Vec<String> {
        Vec::new()
    }
}
