use crate::accessor::PropertyAccessor;
use crate::command::{CommandFactory, Operation};
use crate::descriptor::PropertyDescriptor;
use crate::error::PropertyError;
use crate::registry::KindProperties;
use crate::status::Status;
use crate::validators::validate_all;
use crate::value::{merge, PropertyValue, ValueUpdate};
use std::rc::Rc;

/// Property-sheet view of one object.
///
/// Reads go straight to the kind's accessors. Writes never mutate the
/// object; they return an [`Operation`] for the caller to execute through
/// its undo history.
pub struct PropertyModel<O, W> {
    kind: Rc<KindProperties<O, W>>,
    object: O,
    world: Rc<W>,
}

impl<O: Clone + 'static, W: 'static> PropertyModel<O, W> {
    pub fn new(kind: Rc<KindProperties<O, W>>, object: O, world: Rc<W>) -> Self {
        Self {
            kind,
            object,
            world,
        }
    }

    pub fn object(&self) -> &O {
        &self.object
    }

    /// Static descriptors followed by dynamic ones
    pub fn descriptors(&self) -> Vec<PropertyDescriptor> {
        self.kind.descriptors(&self.object, &self.world)
    }

    pub fn descriptor(&self, property: &str) -> Option<PropertyDescriptor> {
        self.descriptors().into_iter().find(|d| d.id == property)
    }

    /// Accessor owning `property`: the static table first, then the dynamic accessor
    pub fn accessor(&self, property: &str) -> Option<Rc<dyn PropertyAccessor<O, W>>> {
        if self.kind.has_static(property) {
            let accessor: Rc<dyn PropertyAccessor<O, W>> = self.kind.clone();
            return Some(accessor);
        }
        let dynamic = self.kind.dynamic_accessor()?;
        self.kind
            .dynamic_property_descriptors(&self.object, &self.world)
            .iter()
            .any(|d| d.id == property)
            .then(|| dynamic.clone())
    }

    fn require(&self, property: &str) -> Result<Rc<dyn PropertyAccessor<O, W>>, PropertyError> {
        self.accessor(property)
            .ok_or_else(|| PropertyError::UnknownProperty(property.to_string()))
    }

    pub fn value(&self, property: &str) -> Result<PropertyValue, PropertyError> {
        self.require(property)?
            .get_value(&self.object, property, &self.world)
    }

    pub fn is_editable(&self, property: &str) -> bool {
        self.accessor(property)
            .map_or(false, |a| a.is_editable(&self.object, property, &self.world))
    }

    pub fn is_visible(&self, property: &str) -> bool {
        self.accessor(property)
            .map_or(false, |a| a.is_visible(&self.object, property, &self.world))
    }

    pub fn is_overridden(&self, property: &str) -> bool {
        self.accessor(property)
            .map_or(false, |a| a.is_overridden(&self.object, property, &self.world))
    }

    pub fn options(&self, property: &str) -> Vec<String> {
        self.accessor(property)
            .map(|a| a.property_options(&self.object, property, &self.world))
            .unwrap_or_default()
    }

    /// Build the operation writing `update`; `None` when nothing would change
    pub fn set(
        &self,
        property: &str,
        update: impl Into<ValueUpdate>,
    ) -> Result<Option<Box<dyn Operation>>, PropertyError> {
        let accessor = self.require(property)?;
        if !accessor.is_editable(&self.object, property, &self.world) {
            return Err(PropertyError::NotEditable(property.to_string()));
        }
        let old_value = accessor.get_value(&self.object, property, &self.world)?;
        let new_value = merge(property, &old_value, &update.into())?;
        let overridden = accessor.is_overridden(&self.object, property, &self.world);

        Ok(CommandFactory::create(
            self.object.clone(),
            property,
            accessor,
            old_value,
            new_value,
            overridden,
            self.world.clone(),
            false,
        ))
    }

    /// Build the operation removing the override; `None` when not overridden
    pub fn reset(&self, property: &str) -> Result<Option<Box<dyn Operation>>, PropertyError> {
        let accessor = self.require(property)?;
        if !accessor.is_editable(&self.object, property, &self.world) {
            return Err(PropertyError::NotEditable(property.to_string()));
        }
        let old_value = accessor.get_value(&self.object, property, &self.world)?;
        let overridden = accessor.is_overridden(&self.object, property, &self.world);

        Ok(CommandFactory::create_reset(
            self.object.clone(),
            property,
            accessor,
            old_value,
            overridden,
            self.world.clone(),
            false,
        ))
    }

    /// Result of every validator of one property
    pub fn property_status(&self, property: &str) -> Status {
        let value = match self.value(property) {
            Ok(value) => value,
            Err(err) => return Status::error(err.to_string()).with_property(property),
        };
        let validators = self.kind.validators(&self.object, property, &self.world);
        validate_all(&validators, &self.object, property, &value, &*self.world)
    }

    /// Status of every visible property. Evaluation never stops at the first failure.
    pub fn status(&self) -> Status {
        Status::merge(
            self.descriptors()
                .iter()
                .filter(|d| self.is_visible(&d.id))
                .map(|d| self.property_status(&d.id)),
        )
    }
}
