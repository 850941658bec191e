//! # Operations
//!
//! Reversible units of document mutation.
//!
//! Property edits are built by [`CommandFactory`] from the value before and
//! after the edit. Undo writes the old value back and, when the property was
//! not overridden before the edit, removes the override again so the
//! inherited default applies exactly as before.

use crate::accessor::PropertyAccessor;
use crate::error::OperationError;
use crate::value::{PropertyValue, ValueUpdate};
use std::rc::Rc;
use tracing::{debug, warn};

/// A reversible mutation
pub trait Operation {
    /// Human-readable description, shown in undo menus
    fn label(&self) -> &str;

    fn execute(&mut self) -> Result<(), OperationError>;

    fn undo(&mut self) -> Result<(), OperationError>;

    fn redo(&mut self) -> Result<(), OperationError> {
        self.execute()
    }
}

impl std::fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation").field("label", &self.label()).finish()
    }
}

/// Writes one property
pub struct SetPropertyOperation<O, W> {
    label: String,
    object: O,
    property: String,
    accessor: Rc<dyn PropertyAccessor<O, W>>,
    old_value: PropertyValue,
    new_value: PropertyValue,
    was_overridden: bool,
    world: Rc<W>,
}

impl<O, W> SetPropertyOperation<O, W> {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn old_value(&self) -> &PropertyValue {
        &self.old_value
    }

    pub fn new_value(&self) -> &PropertyValue {
        &self.new_value
    }

    fn write(&self, value: &PropertyValue) -> Result<(), OperationError> {
        self.accessor
            .set_value(
                &self.object,
                &self.property,
                &ValueUpdate::Value(value.clone()),
                &self.world,
            )
            .map_err(|e| OperationError::property(&self.label, e))
    }
}

impl<O, W> Operation for SetPropertyOperation<O, W> {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        debug!(property = %self.property, value = %self.new_value, "Setting property");
        self.write(&self.new_value)
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        debug!(property = %self.property, value = %self.old_value, "Restoring property");
        self.write(&self.old_value)?;
        if !self.was_overridden {
            self.accessor
                .reset_value(&self.object, &self.property, &self.world)
                .map_err(|e| OperationError::property(&self.label, e))?;
        }
        Ok(())
    }
}

/// Removes the override of one property
pub struct ResetPropertyOperation<O, W> {
    label: String,
    object: O,
    property: String,
    accessor: Rc<dyn PropertyAccessor<O, W>>,
    old_value: PropertyValue,
    was_overridden: bool,
    world: Rc<W>,
}

impl<O, W> Operation for ResetPropertyOperation<O, W> {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        debug!(property = %self.property, "Resetting property");
        self.accessor
            .reset_value(&self.object, &self.property, &self.world)
            .map_err(|e| OperationError::property(&self.label, e))
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        if !self.was_overridden {
            return Ok(());
        }
        self.accessor
            .set_value(
                &self.object,
                &self.property,
                &ValueUpdate::Value(self.old_value.clone()),
                &self.world,
            )
            .map_err(|e| OperationError::property(&self.label, e))
    }
}

/// Several operations applied as one undo step.
///
/// On a failing member the members already applied in this pass are rolled
/// back before the failure is returned.
pub struct CompositeOperation {
    label: String,
    operations: Vec<Box<dyn Operation>>,
}

impl CompositeOperation {
    pub fn new(label: impl Into<String>, operations: Vec<Box<dyn Operation>>) -> Self {
        Self {
            label: label.into(),
            operations,
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn apply_forward(&mut self, redo: bool) -> Result<(), OperationError> {
        for index in 0..self.operations.len() {
            let result = if redo {
                self.operations[index].redo()
            } else {
                self.operations[index].execute()
            };
            if let Err(err) = result {
                warn!(label = %self.label, error = %err, "Composite step failed, rolling back");
                for applied in self.operations[..index].iter_mut().rev() {
                    if let Err(rollback) = applied.undo() {
                        warn!(label = %applied.label(), error = %rollback, "Rollback step failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Operation for CompositeOperation {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        self.apply_forward(false)
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        let count = self.operations.len();
        for step in 0..count {
            let index = count - 1 - step;
            if let Err(err) = self.operations[index].undo() {
                warn!(label = %self.label, error = %err, "Composite undo failed, reapplying");
                for undone in self.operations[index + 1..].iter_mut() {
                    if let Err(reapply) = undone.redo() {
                        warn!(label = %undone.label(), error = %reapply, "Reapply step failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn redo(&mut self) -> Result<(), OperationError> {
        self.apply_forward(true)
    }
}

/// Builds property operations. Operations are returned unexecuted.
pub struct CommandFactory;

impl CommandFactory {
    /// `None` when the edit would not change anything and is not forced
    #[allow(clippy::too_many_arguments)]
    pub fn create<O: 'static, W: 'static>(
        object: O,
        property: &str,
        accessor: Rc<dyn PropertyAccessor<O, W>>,
        old_value: PropertyValue,
        new_value: PropertyValue,
        overridden: bool,
        world: Rc<W>,
        force: bool,
    ) -> Option<Box<dyn Operation>> {
        if new_value == old_value && !force {
            return None;
        }
        Some(Box::new(SetPropertyOperation {
            label: format!("Set {}", property),
            object,
            property: property.to_string(),
            accessor,
            old_value,
            new_value,
            was_overridden: overridden,
            world,
        }))
    }

    /// `None` when there is no override to remove and the reset is not forced
    pub fn create_reset<O: 'static, W: 'static>(
        object: O,
        property: &str,
        accessor: Rc<dyn PropertyAccessor<O, W>>,
        old_value: PropertyValue,
        overridden: bool,
        world: Rc<W>,
        force: bool,
    ) -> Option<Box<dyn Operation>> {
        if !overridden && !force {
            return None;
        }
        Some(Box::new(ResetPropertyOperation {
            label: format!("Reset {}", property),
            object,
            property: property.to_string(),
            accessor,
            old_value,
            was_overridden: overridden,
            world,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PropertyError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Values with an override table over fixed defaults
    #[derive(Clone, Default)]
    struct Overrides(Rc<RefCell<HashMap<String, PropertyValue>>>);

    struct OverrideAccessor;

    impl PropertyAccessor<Overrides, ()> for OverrideAccessor {
        fn get_value(&self, o: &Overrides, id: &str, _: &()) -> Result<PropertyValue, PropertyError> {
            Ok(o.0
                .borrow()
                .get(id)
                .cloned()
                .unwrap_or(PropertyValue::Number(1.0)))
        }

        fn set_value(&self, o: &Overrides, id: &str, update: &ValueUpdate, w: &()) -> Result<(), PropertyError> {
            if id == "locked" {
                return Err(PropertyError::NotEditable(id.to_string()));
            }
            let current = self.get_value(o, id, w)?;
            let merged = crate::value::merge(id, &current, update)?;
            o.0.borrow_mut().insert(id.to_string(), merged);
            Ok(())
        }

        fn is_overridden(&self, o: &Overrides, id: &str, _: &()) -> bool {
            o.0.borrow().contains_key(id)
        }

        fn reset_value(&self, o: &Overrides, id: &str, _: &()) -> Result<(), PropertyError> {
            o.0.borrow_mut().remove(id);
            Ok(())
        }
    }

    fn set(o: &Overrides, id: &str, old: f64, new: f64, force: bool) -> Option<Box<dyn Operation>> {
        CommandFactory::create(
            o.clone(),
            id,
            Rc::new(OverrideAccessor),
            PropertyValue::Number(old),
            PropertyValue::Number(new),
            OverrideAccessor.is_overridden(o, id, &()),
            Rc::new(()),
            force,
        )
    }

    #[test]
    fn test_create_returns_none_only_for_unforced_no_op() {
        let o = Overrides::default();
        assert!(set(&o, "speed", 1.0, 1.0, false).is_none());
        assert!(set(&o, "speed", 1.0, 1.0, true).is_some());
        assert!(set(&o, "speed", 1.0, 2.0, false).is_some());
        assert!(set(&o, "speed", 1.0, 2.0, true).is_some());
    }

    #[test]
    fn test_undo_removes_override_created_by_edit() {
        let o = Overrides::default();
        let mut op = set(&o, "speed", 1.0, 10.0, false).unwrap();

        op.execute().unwrap();
        assert_eq!(o.0.borrow().get("speed"), Some(&PropertyValue::Number(10.0)));

        op.undo().unwrap();
        assert!(o.0.borrow().is_empty());

        op.redo().unwrap();
        op.undo().unwrap();
        assert!(o.0.borrow().is_empty());
    }

    #[test]
    fn test_undo_keeps_existing_override() {
        let o = Overrides::default();
        o.0.borrow_mut()
            .insert("speed".into(), PropertyValue::Number(4.0));

        let mut op = set(&o, "speed", 4.0, 10.0, false).unwrap();
        op.execute().unwrap();
        op.undo().unwrap();
        assert_eq!(o.0.borrow().get("speed"), Some(&PropertyValue::Number(4.0)));
    }

    #[test]
    fn test_reset_and_undo_reset() {
        let o = Overrides::default();
        o.0.borrow_mut()
            .insert("speed".into(), PropertyValue::Number(4.0));

        let mut op = CommandFactory::create_reset(
            o.clone(),
            "speed",
            Rc::new(OverrideAccessor),
            PropertyValue::Number(4.0),
            true,
            Rc::new(()),
            false,
        )
        .unwrap();

        op.execute().unwrap();
        assert!(o.0.borrow().is_empty());
        op.undo().unwrap();
        assert_eq!(o.0.borrow().get("speed"), Some(&PropertyValue::Number(4.0)));

        assert!(CommandFactory::create_reset(
            o.clone(),
            "other",
            Rc::new(OverrideAccessor),
            PropertyValue::Number(1.0),
            false,
            Rc::new(()),
            false,
        )
        .is_none());
    }

    #[test]
    fn test_composite_rolls_back_on_failure() {
        let o = Overrides::default();
        let ops = vec![
            set(&o, "speed", 1.0, 2.0, false).unwrap(),
            set(&o, "mass", 1.0, 3.0, false).unwrap(),
            set(&o, "locked", 1.0, 5.0, false).unwrap(),
        ];
        let mut composite = CompositeOperation::new("Move", ops);

        let err = composite.execute().unwrap_err();
        assert!(matches!(err, OperationError::Property { .. }));
        assert!(o.0.borrow().is_empty());
    }

    #[test]
    fn test_composite_undo_redo() {
        let o = Overrides::default();
        let ops = vec![
            set(&o, "speed", 1.0, 2.0, false).unwrap(),
            set(&o, "mass", 1.0, 3.0, false).unwrap(),
        ];
        let mut composite = CompositeOperation::new("Tweak", ops);
        assert_eq!(composite.len(), 2);

        composite.execute().unwrap();
        assert_eq!(o.0.borrow().len(), 2);
        composite.undo().unwrap();
        assert!(o.0.borrow().is_empty());
        composite.redo().unwrap();
        assert_eq!(o.0.borrow().get("mass"), Some(&PropertyValue::Number(3.0)));
    }
}
