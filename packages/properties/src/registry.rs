//! # Property Registry
//!
//! Declarative per-kind property tables.
//!
//! A kind is registered once at startup from a [`KindBuilder`]: an ordered
//! list of static [`PropertyDef`]s plus, for kinds whose properties are only
//! known at runtime, one dynamic descriptor provider, one dynamic accessor
//! and one dynamic validator provider. Inconsistent declarations are
//! rejected by [`PropertyRegistry::register`] with a [`ConfigurationError`].
//!
//! ## Example
//!
//! ```rust
//! use scened_properties::*;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! #[derive(Clone)]
//! struct Body(Rc<Cell<f64>>);
//!
//! let mut registry: PropertyRegistry<Body, ()> = PropertyRegistry::new();
//! registry
//!     .register(
//!         KindBuilder::new("body").property(
//!             PropertyDef::new("mass", "Mass", ValueType::Number)
//!                 .getter(|b: &Body| PropertyValue::Number(b.0.get()))
//!                 .setter(|b: &Body, v, _| {
//!                     b.0.set(v.as_f64().unwrap_or_default());
//!                     Ok(())
//!                 })
//!                 .validator(GreaterThanZero),
//!         ),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.introspect("body").unwrap()[0].id, "mass");
//! ```

use crate::accessor::PropertyAccessor;
use crate::descriptor::PropertyDescriptor;
use crate::error::{ConfigurationError, PropertyError};
use crate::validators::Validator;
use crate::value::{merge, PropertyValue, ValueType, ValueUpdate};
use indexmap::IndexMap;
use std::rc::Rc;

type Getter<O> = Box<dyn Fn(&O) -> PropertyValue>;
type Setter<O, W> = Box<dyn Fn(&O, PropertyValue, &W) -> Result<(), PropertyError>>;
type Predicate<O> = Box<dyn Fn(&O) -> bool>;
type Options<O, W> = Box<dyn Fn(&O, &W) -> Vec<String>>;

/// Provides the runtime-discovered property descriptors of an object
pub trait DynamicProperties<O, W> {
    fn descriptors(&self, object: &O, world: &W) -> Vec<PropertyDescriptor>;
}

/// Provides validators for runtime-discovered properties
pub trait DynamicValidators<O, W> {
    fn validators(&self, object: &O, property: &str, world: &W) -> Vec<Rc<dyn Validator<O, W>>>;
}

/// One row of a kind's static property table
pub struct PropertyDef<O, W> {
    descriptor: PropertyDescriptor,
    getter: Option<Getter<O>>,
    setter: Option<Setter<O, W>>,
    default: Option<PropertyValue>,
    validators: Vec<Rc<dyn Validator<O, W>>>,
    visible: Option<Predicate<O>>,
    editable: Option<Predicate<O>>,
    options: Option<Options<O, W>>,
}

impl<O, W> PropertyDef<O, W> {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            descriptor: PropertyDescriptor::new(id, display_name, value_type),
            getter: None,
            setter: None,
            default: None,
            validators: Vec::new(),
            visible: None,
            editable: None,
            options: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.descriptor.category = category.into();
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.descriptor.range = Some((min, max));
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn getter(mut self, getter: impl Fn(&O) -> PropertyValue + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    pub fn setter(
        mut self,
        setter: impl Fn(&O, PropertyValue, &W) -> Result<(), PropertyError> + 'static,
    ) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Inherited value; the property counts as overridden while it differs
    pub fn default_value(mut self, value: PropertyValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validator(mut self, validator: impl Validator<O, W> + 'static) -> Self {
        self.validators.push(Rc::new(validator));
        self
    }

    pub fn visible_when(mut self, predicate: impl Fn(&O) -> bool + 'static) -> Self {
        self.visible = Some(Box::new(predicate));
        self
    }

    pub fn editable_when(mut self, predicate: impl Fn(&O) -> bool + 'static) -> Self {
        self.editable = Some(Box::new(predicate));
        self
    }

    pub fn options(mut self, options: impl Fn(&O, &W) -> Vec<String> + 'static) -> Self {
        self.options = Some(Box::new(options));
        self
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    pub fn validators(&self) -> &[Rc<dyn Validator<O, W>>] {
        &self.validators
    }
}

/// Collects the declarations of one kind before registration
pub struct KindBuilder<O, W> {
    kind: String,
    properties: Vec<PropertyDef<O, W>>,
    dynamic_descriptors: Option<Rc<dyn DynamicProperties<O, W>>>,
    dynamic_accessor: Option<Rc<dyn PropertyAccessor<O, W>>>,
    dynamic_validators: Option<Rc<dyn DynamicValidators<O, W>>>,
    errors: Vec<ConfigurationError>,
}

impl<O, W> KindBuilder<O, W> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Vec::new(),
            dynamic_descriptors: None,
            dynamic_accessor: None,
            dynamic_validators: None,
            errors: Vec::new(),
        }
    }

    pub fn property(mut self, def: PropertyDef<O, W>) -> Self {
        self.properties.push(def);
        self
    }

    pub fn dynamic_descriptors(mut self, provider: impl DynamicProperties<O, W> + 'static) -> Self {
        if self.dynamic_descriptors.is_some() {
            self.duplicate("dynamic descriptor provider");
        }
        self.dynamic_descriptors = Some(Rc::new(provider));
        self
    }

    pub fn dynamic_accessor(mut self, accessor: impl PropertyAccessor<O, W> + 'static) -> Self {
        if self.dynamic_accessor.is_some() {
            self.duplicate("dynamic accessor");
        }
        self.dynamic_accessor = Some(Rc::new(accessor));
        self
    }

    pub fn dynamic_validators(mut self, provider: impl DynamicValidators<O, W> + 'static) -> Self {
        if self.dynamic_validators.is_some() {
            self.duplicate("dynamic validator provider");
        }
        self.dynamic_validators = Some(Rc::new(provider));
        self
    }

    fn duplicate(&mut self, capability: &'static str) {
        self.errors.push(ConfigurationError::DuplicateCapability {
            kind: self.kind.clone(),
            capability,
        });
    }

    /// Check the declarations and freeze them
    pub fn build(mut self) -> Result<KindProperties<O, W>, ConfigurationError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if self.dynamic_descriptors.is_some() && self.dynamic_accessor.is_none() {
            return Err(ConfigurationError::MissingDynamicAccessor(self.kind));
        }

        let mut properties = IndexMap::new();
        for def in self.properties {
            let id = def.descriptor.id.clone();
            if def.getter.is_none() {
                return Err(ConfigurationError::MissingGetter {
                    kind: self.kind,
                    property: id,
                });
            }
            if properties.contains_key(&id) {
                return Err(ConfigurationError::DuplicateProperty {
                    kind: self.kind,
                    property: id,
                });
            }
            properties.insert(id, def);
        }

        let descriptors = properties.values().map(|d| d.descriptor.clone()).collect();

        Ok(KindProperties {
            kind: self.kind,
            properties,
            descriptors,
            dynamic_descriptors: self.dynamic_descriptors,
            dynamic_accessor: self.dynamic_accessor,
            dynamic_validators: self.dynamic_validators,
        })
    }
}

/// Frozen property table of one kind
pub struct KindProperties<O, W> {
    kind: String,
    properties: IndexMap<String, PropertyDef<O, W>>,
    descriptors: Vec<PropertyDescriptor>,
    dynamic_descriptors: Option<Rc<dyn DynamicProperties<O, W>>>,
    dynamic_accessor: Option<Rc<dyn PropertyAccessor<O, W>>>,
    dynamic_validators: Option<Rc<dyn DynamicValidators<O, W>>>,
}

impl<O, W> KindProperties<O, W> {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Static descriptors in declaration order
    pub fn static_descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    pub fn has_static(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Static descriptors followed by the object's dynamic ones
    pub fn descriptors(&self, object: &O, world: &W) -> Vec<PropertyDescriptor> {
        let mut descriptors = self.descriptors.clone();
        descriptors.extend(self.dynamic_property_descriptors(object, world));
        descriptors
    }

    pub fn dynamic_property_descriptors(&self, object: &O, world: &W) -> Vec<PropertyDescriptor> {
        self.dynamic_descriptors
            .as_ref()
            .map(|provider| {
                provider
                    .descriptors(object, world)
                    .into_iter()
                    .filter(|d| !self.properties.contains_key(&d.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dynamic_accessor(&self) -> Option<&Rc<dyn PropertyAccessor<O, W>>> {
        self.dynamic_accessor.as_ref()
    }

    /// Validators of a property, static or dynamic
    pub fn validators(&self, object: &O, property: &str, world: &W) -> Vec<Rc<dyn Validator<O, W>>> {
        match self.properties.get(property) {
            Some(def) => def.validators.clone(),
            None => self
                .dynamic_validators
                .as_ref()
                .map(|p| p.validators(object, property, world))
                .unwrap_or_default(),
        }
    }

    fn def(&self, property: &str) -> Result<&PropertyDef<O, W>, PropertyError> {
        self.properties
            .get(property)
            .ok_or_else(|| PropertyError::UnknownProperty(property.to_string()))
    }

    fn read(&self, def: &PropertyDef<O, W>, object: &O) -> Result<PropertyValue, PropertyError> {
        def.getter
            .as_ref()
            .map(|getter| getter(object))
            .ok_or_else(|| PropertyError::UnknownProperty(def.descriptor.id.clone()))
    }
}

/// Accessor over the static table
impl<O, W> PropertyAccessor<O, W> for KindProperties<O, W> {
    fn get_value(&self, object: &O, property: &str, _world: &W) -> Result<PropertyValue, PropertyError> {
        let def = self.def(property)?;
        self.read(def, object)
    }

    fn set_value(
        &self,
        object: &O,
        property: &str,
        update: &ValueUpdate,
        world: &W,
    ) -> Result<(), PropertyError> {
        let def = self.def(property)?;
        let setter = def
            .setter
            .as_ref()
            .ok_or_else(|| PropertyError::NotEditable(property.to_string()))?;
        let current = self.read(def, object)?;
        setter(object, merge(property, &current, update)?, world)
    }

    fn is_editable(&self, object: &O, property: &str, _world: &W) -> bool {
        match self.properties.get(property) {
            Some(def) => def.setter.is_some() && def.editable.as_ref().map_or(true, |p| p(object)),
            None => false,
        }
    }

    fn is_visible(&self, object: &O, property: &str, _world: &W) -> bool {
        match self.properties.get(property) {
            Some(def) => def.visible.as_ref().map_or(true, |p| p(object)),
            None => false,
        }
    }

    fn is_overridden(&self, object: &O, property: &str, _world: &W) -> bool {
        match self.properties.get(property) {
            Some(def) => match (&def.default, self.read(def, object)) {
                (Some(default), Ok(current)) => &current != default,
                _ => false,
            },
            None => false,
        }
    }

    fn reset_value(&self, object: &O, property: &str, world: &W) -> Result<(), PropertyError> {
        let def = self.def(property)?;
        match (&def.default, &def.setter) {
            (Some(default), Some(setter)) => setter(object, default.clone(), world),
            (Some(_), None) => Err(PropertyError::NotEditable(property.to_string())),
            (None, _) => Ok(()),
        }
    }

    fn property_options(&self, object: &O, property: &str, world: &W) -> Vec<String> {
        self.properties
            .get(property)
            .and_then(|def| def.options.as_ref())
            .map(|options| options(object, world))
            .unwrap_or_default()
    }
}

/// Registry of every kind's property table, built once at startup
pub struct PropertyRegistry<O, W> {
    kinds: IndexMap<String, Rc<KindProperties<O, W>>>,
}

impl<O, W> PropertyRegistry<O, W> {
    pub fn new() -> Self {
        Self {
            kinds: IndexMap::new(),
        }
    }

    /// Validate and register a kind
    pub fn register(
        &mut self,
        builder: KindBuilder<O, W>,
    ) -> Result<Rc<KindProperties<O, W>>, ConfigurationError> {
        let properties = builder.build()?;
        if self.kinds.contains_key(properties.kind()) {
            return Err(ConfigurationError::DuplicateKind(properties.kind().to_string()));
        }
        let properties = Rc::new(properties);
        self.kinds
            .insert(properties.kind().to_string(), properties.clone());
        Ok(properties)
    }

    /// Static descriptors of a kind, in declaration order
    pub fn introspect(&self, kind: &str) -> Option<&[PropertyDescriptor]> {
        self.kinds.get(kind).map(|k| k.static_descriptors())
    }

    pub fn kind(&self, kind: &str) -> Option<Rc<KindProperties<O, W>>> {
        self.kinds.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl<O, W> Default for PropertyRegistry<O, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, W> std::fmt::Debug for PropertyRegistry<O, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::NotZero;
    use std::cell::RefCell;

    #[derive(Clone, Default)]
    struct Thing(Rc<RefCell<[f64; 3]>>);

    struct NoDescriptors;

    impl DynamicProperties<Thing, ()> for NoDescriptors {
        fn descriptors(&self, _object: &Thing, _world: &()) -> Vec<PropertyDescriptor> {
            Vec::new()
        }
    }

    struct NoValidators;

    impl DynamicValidators<Thing, ()> for NoValidators {
        fn validators(&self, _: &Thing, _: &str, _: &()) -> Vec<Rc<dyn Validator<Thing, ()>>> {
            Vec::new()
        }
    }

    fn scale() -> PropertyDef<Thing, ()> {
        PropertyDef::new("scale", "Scale", ValueType::Vector3)
            .category("Transform")
            .getter(|t: &Thing| PropertyValue::Vector3(*t.0.borrow()))
            .setter(|t: &Thing, v, _| match v {
                PropertyValue::Vector3(v) => {
                    *t.0.borrow_mut() = v;
                    Ok(())
                }
                other => Err(PropertyError::TypeMismatch {
                    property: "scale".into(),
                    expected: ValueType::Vector3,
                    found: other.value_type(),
                }),
            })
            .default_value(PropertyValue::Vector3([1.0; 3]))
            .validator(NotZero)
    }

    #[test]
    fn test_introspect_keeps_declaration_order() {
        let mut registry = PropertyRegistry::new();
        registry
            .register(
                KindBuilder::new("thing")
                    .property(scale())
                    .property(
                        PropertyDef::new("id", "Id", ValueType::Text)
                            .getter(|_: &Thing| PropertyValue::Text("t".into())),
                    ),
            )
            .unwrap();

        let ids: Vec<_> = registry
            .introspect("thing")
            .unwrap()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["scale", "id"]);
        assert!(registry.introspect("other").is_none());
    }

    #[test]
    fn test_static_accessor_merges_and_resets() {
        let kind = KindBuilder::new("thing").property(scale()).build().unwrap();
        let thing = Thing::default();
        *thing.0.borrow_mut() = [1.0; 3];

        assert!(!kind.is_overridden(&thing, "scale", &()));
        kind.set_value(&thing, "scale", &ValueUpdate::y(2.0), &()).unwrap();
        assert_eq!(*thing.0.borrow(), [1.0, 2.0, 1.0]);
        assert!(kind.is_overridden(&thing, "scale", &()));

        kind.reset_value(&thing, "scale", &()).unwrap();
        assert_eq!(*thing.0.borrow(), [1.0; 3]);
    }

    #[test]
    fn test_read_only_property() {
        let kind = KindBuilder::<Thing, ()>::new("thing")
            .property(
                PropertyDef::new("id", "Id", ValueType::Text)
                    .getter(|_: &Thing| PropertyValue::Text("t".into())),
            )
            .build()
            .unwrap();
        let thing = Thing::default();

        assert!(!kind.is_editable(&thing, "id", &()));
        let err = kind
            .set_value(&thing, "id", &PropertyValue::Text("u".into()).into(), &())
            .unwrap_err();
        assert_eq!(err, PropertyError::NotEditable("id".into()));
    }

    #[test]
    fn test_configuration_errors() {
        let missing_getter = KindBuilder::<Thing, ()>::new("thing")
            .property(PropertyDef::new("id", "Id", ValueType::Text))
            .build();
        assert!(matches!(
            missing_getter,
            Err(ConfigurationError::MissingGetter { .. })
        ));

        let duplicate = KindBuilder::new("thing")
            .property(scale())
            .property(scale())
            .build();
        assert!(matches!(
            duplicate,
            Err(ConfigurationError::DuplicateProperty { .. })
        ));

        let twice = KindBuilder::<Thing, ()>::new("thing")
            .dynamic_validators(NoValidators)
            .dynamic_validators(NoValidators)
            .build();
        assert!(matches!(
            twice,
            Err(ConfigurationError::DuplicateCapability {
                capability: "dynamic validator provider",
                ..
            })
        ));

        let no_accessor = KindBuilder::<Thing, ()>::new("thing")
            .dynamic_descriptors(NoDescriptors)
            .build();
        assert_eq!(
            no_accessor.err(),
            Some(ConfigurationError::MissingDynamicAccessor("thing".into()))
        );
    }

    #[test]
    fn test_duplicate_kind() {
        let mut registry = PropertyRegistry::<Thing, ()>::new();
        registry.register(KindBuilder::new("thing")).unwrap();
        let err = registry.register(KindBuilder::new("thing")).err();
        assert_eq!(err, Some(ConfigurationError::DuplicateKind("thing".into())));
    }
}
