//! # Node Properties
//!
//! Property tables of the built-in node kinds.
//!
//! Static properties of locked nodes (nodes loaded from a referenced
//! document) are read-only. Script properties of a component are dynamic:
//! their values live in a chain of override slots, from the outermost
//! collection instance down to the component itself. Reads take the first
//! slot holding a value; writes go to the first slot the containing
//! document owns.

use crate::context::{LoaderContext, NodeProperties};
use crate::node::{
    kinds, BlendMode, Collection, CollectionInstance, CollisionShape, ComponentRef, GameObject,
    GameObjectInstance, NodeFlags, NodeKind, NodeRef, OverrideKey, ShapeType, TileGrid, TileLayer,
};
use crate::reload::{reload_component, reload_reference};
use indexmap::IndexMap;
use scened_common::normalize_resource_path;
use scened_properties::{
    merge, ConfigurationError, DynamicProperties, DynamicValidators, GreaterThanZero, KindBuilder,
    NotEmpty, PropertyAccessor, PropertyDef, PropertyDescriptor, PropertyError, PropertyRegistry,
    PropertyValue, Range, ResourceExists, Status, ValueType, ValueUpdate, Validator,
};
use std::rc::Rc;

type Def = PropertyDef<NodeRef, LoaderContext>;
type Kind = KindBuilder<NodeRef, LoaderContext>;

/// Registry holding every built-in kind
pub fn registry() -> Result<NodeProperties, ConfigurationError> {
    let mut registry = PropertyRegistry::new();
    for kind in [
        collection(),
        game_object(),
        game_object_instance(),
        collection_instance(),
        component(),
        collision_shape(),
        tile_grid(),
        tile_layer(),
    ] {
        registry.register(kind)?;
    }
    Ok(registry)
}

macro_rules! payload {
    ($read:ident, $write:ident, $variant:ident, $payload:ty) => {
        fn $read<T>(node: &NodeRef, read: impl FnOnce(&$payload) -> T) -> Option<T> {
            match node.borrow().kind() {
                NodeKind::$variant(payload) => Some(read(payload)),
                _ => None,
            }
        }

        fn $write(node: &NodeRef, write: impl FnOnce(&mut $payload)) {
            if let NodeKind::$variant(payload) = node.borrow_mut().kind_mut() {
                write(payload);
            }
            node.notify_change();
        }
    };
}

payload!(read_collection, write_collection, Collection, Collection);
payload!(read_game_object, write_game_object, GameObject, GameObject);
payload!(read_instance, write_instance, GameObjectInstance, GameObjectInstance);
payload!(read_collection_instance, write_collection_instance, CollectionInstance, CollectionInstance);
payload!(read_component, write_component, ComponentRef, ComponentRef);
payload!(read_shape, write_shape, CollisionShape, CollisionShape);
payload!(read_grid, write_grid, TileGrid, TileGrid);
payload!(read_layer, write_layer, TileLayer, TileLayer);

fn unlocked(node: &NodeRef) -> bool {
    !node.has_flag(NodeFlags::LOCKED)
}

fn mismatch(property: &str, expected: ValueType, value: &PropertyValue) -> PropertyError {
    PropertyError::TypeMismatch {
        property: property.to_string(),
        expected,
        found: value.value_type(),
    }
}

fn text(property: &str, value: &PropertyValue) -> Result<String, PropertyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(property, ValueType::Text, value))
}

fn resource_path(property: &str, value: &PropertyValue) -> Result<String, PropertyError> {
    let path = text(property, value)?;
    Ok(if path.trim().is_empty() {
        String::new()
    } else {
        normalize_resource_path(&path)
    })
}

fn number(property: &str, value: &PropertyValue) -> Result<f64, PropertyError> {
    value
        .as_f64()
        .ok_or_else(|| mismatch(property, ValueType::Number, value))
}

fn boolean(property: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
    value
        .as_bool()
        .ok_or_else(|| mismatch(property, ValueType::Bool, value))
}

fn vector3(property: &str, value: &PropertyValue) -> Result<[f64; 3], PropertyError> {
    value
        .as_vector3()
        .ok_or_else(|| mismatch(property, ValueType::Vector3, value))
}

fn quat(property: &str, value: &PropertyValue) -> Result<[f64; 4], PropertyError> {
    match value {
        PropertyValue::Quat(q) => Ok(*q),
        other => Err(mismatch(property, ValueType::Quat, other)),
    }
}

fn invalid_choice(value: &str) -> PropertyError {
    PropertyError::InvalidText {
        value_type: ValueType::Enum,
        text: value.to_string(),
    }
}

/// Id of a node that has one
fn id_property(required: bool) -> Def {
    let def = PropertyDef::new("id", "Id", ValueType::Text)
        .getter(|n: &NodeRef| PropertyValue::Text(n.id().unwrap_or_default()))
        .setter(|n: &NodeRef, v, _| {
            let id = text("id", &v)?;
            n.borrow_mut().kind_mut().set_id(id);
            n.notify_change();
            Ok(())
        })
        .editable_when(unlocked);
    if required {
        def.validator(NotEmpty::default())
    } else {
        def
    }
}

fn position() -> Def {
    PropertyDef::new("position", "Position", ValueType::Vector3)
        .category("Transform")
        .getter(|n: &NodeRef| PropertyValue::Vector3(n.borrow().transform().position))
        .setter(|n: &NodeRef, v, _| {
            n.borrow_mut().transform_mut().position = vector3("position", &v)?;
            n.notify_change();
            Ok(())
        })
        .default_value(PropertyValue::Vector3([0.0; 3]))
        .editable_when(|n| unlocked(n) && n.has_flag(NodeFlags::TRANSFORMABLE))
}

fn rotation() -> Def {
    PropertyDef::new("rotation", "Rotation", ValueType::Quat)
        .category("Transform")
        .getter(|n: &NodeRef| PropertyValue::Quat(n.borrow().transform().rotation))
        .setter(|n: &NodeRef, v, _| {
            n.borrow_mut().transform_mut().rotation = quat("rotation", &v)?;
            n.notify_change();
            Ok(())
        })
        .default_value(PropertyValue::Quat([0.0, 0.0, 0.0, 1.0]))
        .editable_when(|n| unlocked(n) && n.has_flag(NodeFlags::TRANSFORMABLE))
}

fn scale() -> Def {
    PropertyDef::new("scale", "Scale", ValueType::Vector3)
        .category("Transform")
        .getter(|n: &NodeRef| PropertyValue::Vector3(n.borrow().transform().scale))
        .setter(|n: &NodeRef, v, _| {
            n.borrow_mut().transform_mut().scale = vector3("scale", &v)?;
            n.notify_change();
            Ok(())
        })
        .default_value(PropertyValue::Vector3([1.0; 3]))
        .validator(GreaterThanZero)
        .editable_when(|n| unlocked(n) && n.has_flag(NodeFlags::SCALABLE))
}

fn collection() -> Kind {
    KindBuilder::new(kinds::COLLECTION)
        .property(
            PropertyDef::new("name", "Name", ValueType::Text)
                .getter(|n: &NodeRef| {
                    PropertyValue::Text(read_collection(n, |c| c.name.clone()).unwrap_or_default())
                })
                .setter(|n: &NodeRef, v, _| {
                    let name = text("name", &v)?;
                    write_collection(n, |c| c.name = name);
                    Ok(())
                })
                .editable_when(unlocked),
        )
        .property(
            PropertyDef::new("scale_along_z", "Scale Along Z", ValueType::Bool)
                .getter(|n: &NodeRef| {
                    PropertyValue::Bool(read_collection(n, |c| c.scale_along_z).unwrap_or(false))
                })
                .setter(|n: &NodeRef, v, _| {
                    let on = boolean("scale_along_z", &v)?;
                    write_collection(n, |c| c.scale_along_z = on);
                    Ok(())
                })
                .default_value(PropertyValue::Bool(false))
                .editable_when(unlocked),
        )
}

/// Only game objects embedded in a collection have an id and a transform
fn embedded(node: &NodeRef) -> bool {
    read_game_object(node, |go| go.id.is_some()).unwrap_or(false)
}

fn game_object() -> Kind {
    KindBuilder::new(kinds::GAME_OBJECT)
        .property(
            PropertyDef::new("id", "Id", ValueType::Text)
                .getter(|n: &NodeRef| {
                    PropertyValue::Text(read_game_object(n, |go| go.id.clone()).flatten().unwrap_or_default())
                })
                .setter(|n: &NodeRef, v, _| {
                    let id = text("id", &v)?;
                    write_game_object(n, |go| go.id = Some(id));
                    Ok(())
                })
                .validator(NotEmpty::default())
                .visible_when(embedded)
                .editable_when(unlocked),
        )
        .property(position().visible_when(embedded))
        .property(rotation().visible_when(embedded))
        .property(scale().visible_when(embedded))
}

fn game_object_instance() -> Kind {
    KindBuilder::new(kinds::GAME_OBJECT_INSTANCE)
        .property(id_property(true))
        .property(
            PropertyDef::new("prototype", "Prototype", ValueType::Resource)
                .extensions(["go"])
                .getter(|n: &NodeRef| {
                    PropertyValue::Resource(read_instance(n, |i| i.prototype.clone()).unwrap_or_default())
                })
                .setter(|n: &NodeRef, v, ctx: &LoaderContext| {
                    let path = resource_path("prototype", &v)?;
                    write_instance(n, |i| i.prototype = path);
                    reload_reference(n, ctx);
                    Ok(())
                })
                .validator(NotEmpty::default())
                .validator(ResourceExists::with_extensions(["go"]))
                .editable_when(unlocked),
        )
        .property(position())
        .property(rotation())
        .property(scale())
}

fn collection_instance() -> Kind {
    KindBuilder::new(kinds::COLLECTION_INSTANCE)
        .property(id_property(true))
        .property(
            PropertyDef::new("collection", "Collection", ValueType::Resource)
                .extensions(["collection"])
                .getter(|n: &NodeRef| {
                    PropertyValue::Resource(
                        read_collection_instance(n, |i| i.collection.clone()).unwrap_or_default(),
                    )
                })
                .setter(|n: &NodeRef, v, ctx: &LoaderContext| {
                    let path = resource_path("collection", &v)?;
                    write_collection_instance(n, |i| i.collection = path);
                    reload_reference(n, ctx);
                    Ok(())
                })
                .validator(NotEmpty::default())
                .validator(ResourceExists::with_extensions(["collection"]))
                .editable_when(unlocked),
        )
        .property(position())
        .property(rotation())
        .property(scale())
}

fn component() -> Kind {
    KindBuilder::new(kinds::COMPONENT)
        .property(id_property(true))
        .property(
            PropertyDef::new("component", "Script", ValueType::Resource)
                .extensions(["script"])
                .getter(|n: &NodeRef| {
                    PropertyValue::Resource(read_component(n, |c| c.component.clone()).unwrap_or_default())
                })
                .setter(|n: &NodeRef, v, ctx: &LoaderContext| {
                    let path = resource_path("component", &v)?;
                    write_component(n, |c| c.component = path);
                    reload_component(n, ctx);
                    Ok(())
                })
                .validator(NotEmpty::default())
                .validator(ResourceExists::with_extensions(["script"]))
                .editable_when(unlocked),
        )
        .dynamic_descriptors(ScriptDescriptors)
        .dynamic_accessor(ScriptAccessor)
        .dynamic_validators(ScriptValidators)
}

fn collision_shape() -> Kind {
    KindBuilder::new(kinds::COLLISION_SHAPE)
        .property(id_property(false).visible_when(|n| n.id().is_some()))
        .property(
            PropertyDef::new("shape_type", "Shape", ValueType::Enum)
                .getter(|n: &NodeRef| {
                    let shape = read_shape(n, |s| s.shape_type).unwrap_or_default();
                    PropertyValue::Enum(shape.as_str().to_string())
                })
                .setter(|n: &NodeRef, v, _| {
                    let name = text("shape_type", &v)?;
                    let shape = ShapeType::parse(&name).ok_or_else(|| invalid_choice(&name))?;
                    write_shape(n, |s| s.shape_type = shape);
                    Ok(())
                })
                .options(|_, _| ShapeType::ALL.iter().map(|s| s.as_str().to_string()).collect())
                .editable_when(unlocked),
        )
        .property(
            PropertyDef::new("dimensions", "Dimensions", ValueType::Vector3)
                .getter(|n: &NodeRef| {
                    PropertyValue::Vector3(read_shape(n, |s| s.dimensions).unwrap_or([1.0; 3]))
                })
                .setter(|n: &NodeRef, v, _| {
                    let dimensions = vector3("dimensions", &v)?;
                    write_shape(n, |s| s.dimensions = dimensions);
                    Ok(())
                })
                .validator(GreaterThanZero)
                .editable_when(unlocked),
        )
}

fn tile_grid() -> Kind {
    let tile_sets = ["tilesource", "tileset"];
    KindBuilder::new(kinds::TILE_GRID)
        .property(
            PropertyDef::new("tile_set", "Tile Source", ValueType::Resource)
                .extensions(tile_sets)
                .getter(|n: &NodeRef| {
                    PropertyValue::Resource(read_grid(n, |g| g.tile_set.clone()).unwrap_or_default())
                })
                .setter(|n: &NodeRef, v, _| {
                    let path = resource_path("tile_set", &v)?;
                    write_grid(n, |g| g.tile_set = path);
                    Ok(())
                })
                .validator(NotEmpty::default())
                .validator(ResourceExists::with_extensions(tile_sets))
                .editable_when(unlocked),
        )
        .property(
            PropertyDef::new("blend_mode", "Blend Mode", ValueType::Enum)
                .getter(|n: &NodeRef| {
                    let mode = read_grid(n, |g| g.blend_mode).unwrap_or_default();
                    PropertyValue::Enum(mode.as_str().to_string())
                })
                .setter(|n: &NodeRef, v, _| {
                    let name = text("blend_mode", &v)?;
                    let mode = BlendMode::parse(&name).ok_or_else(|| invalid_choice(&name))?;
                    write_grid(n, |g| g.blend_mode = mode);
                    Ok(())
                })
                .options(|_, _| BlendMode::ALL.iter().map(|m| m.as_str().to_string()).collect())
                .default_value(PropertyValue::Enum(BlendMode::Alpha.as_str().to_string()))
                .editable_when(unlocked),
        )
}

fn tile_layer() -> Kind {
    KindBuilder::new(kinds::TILE_LAYER)
        .property(id_property(true))
        .property(
            PropertyDef::new("z", "Z", ValueType::Number)
                .range(-1.0, 1.0)
                .getter(|n: &NodeRef| PropertyValue::Number(read_layer(n, |l| l.z).unwrap_or(0.0)))
                .setter(|n: &NodeRef, v, _| {
                    let z = number("z", &v)?;
                    write_layer(n, |l| l.z = z);
                    if let Some(grid) = n.parent() {
                        grid.sort_children();
                        grid.notify_change();
                    }
                    Ok(())
                })
                .validator(Range::new(-1.0, 1.0))
                .editable_when(unlocked),
        )
        .property(
            PropertyDef::new("is_visible", "Visible", ValueType::Bool)
                .getter(|n: &NodeRef| PropertyValue::Bool(read_layer(n, |l| l.visible).unwrap_or(true)))
                .setter(|n: &NodeRef, v, _| {
                    let visible = boolean("is_visible", &v)?;
                    write_layer(n, |l| l.visible = visible);
                    Ok(())
                })
                .default_value(PropertyValue::Bool(true))
                .editable_when(unlocked),
        )
}

/// One place a script property value can be stored
struct Slot {
    owner: NodeRef,
    /// Override table key for instances; `None` for the component's own table
    key: Option<OverrideKey>,
}

impl Slot {
    fn get(&self, property: &str) -> Option<String> {
        let node = self.owner.borrow();
        match (&self.key, node.kind()) {
            (Some(key), kind) => kind.overrides()?.get(key)?.get(property).cloned(),
            (None, NodeKind::ComponentRef(component)) => component.properties.get(property).cloned(),
            _ => None,
        }
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut IndexMap<String, String>) -> T) -> Option<T> {
        let mut node = self.owner.borrow_mut();
        match (&self.key, node.kind_mut()) {
            (Some(key), kind) => {
                let overrides = kind.overrides_mut()?;
                let result = f(overrides.entry(key.clone()).or_default());
                if overrides.get(key).map_or(false, IndexMap::is_empty) {
                    overrides.shift_remove(key);
                }
                Some(result)
            }
            (None, NodeKind::ComponentRef(component)) => Some(f(&mut component.properties)),
            _ => None,
        }
    }
}

/// Override slots of a component, outermost first
fn slots(component: &NodeRef) -> Vec<Slot> {
    let mut slots = Vec::new();
    let component_id = component.id().unwrap_or_default();
    if let Some(game_object) = component.parent() {
        let mut instances = Vec::new();
        let mut current = game_object.parent();
        while let Some(node) = current {
            if matches!(node.borrow().kind(), NodeKind::CollectionInstance(_)) {
                instances.push(node.clone());
            }
            current = node.parent();
        }
        for instance in instances.into_iter().rev() {
            if let Some(path) = game_object.instance_path_from(&instance) {
                slots.push(Slot {
                    owner: instance,
                    key: Some(OverrideKey::nested(path, component_id.as_str())),
                });
            }
        }

        if matches!(game_object.borrow().kind(), NodeKind::GameObjectInstance(_)) {
            slots.push(Slot {
                owner: game_object.clone(),
                key: Some(OverrideKey::component(component_id.as_str())),
            });
        }
    }
    slots.push(Slot {
        owner: component.clone(),
        key: None,
    });
    slots
}

/// First slot the containing document may write
fn writer(component: &NodeRef) -> Option<Slot> {
    slots(component).into_iter().find(|s| unlocked(&s.owner))
}

/// Stored text of a property, from the first slot holding it
fn stored(component: &NodeRef, property: &str) -> Option<String> {
    slots(component).iter().find_map(|s| s.get(property))
}

fn declared(component: &NodeRef, property: &str) -> Result<(ValueType, PropertyValue), PropertyError> {
    read_component(component, |c| {
        c.declared(property).map(|p| (p.value_type, p.default.clone()))
    })
    .flatten()
    .ok_or_else(|| PropertyError::UnknownProperty(property.to_string()))
}

struct ScriptDescriptors;

impl DynamicProperties<NodeRef, LoaderContext> for ScriptDescriptors {
    fn descriptors(&self, object: &NodeRef, _world: &LoaderContext) -> Vec<PropertyDescriptor> {
        read_component(object, |c| {
            c.declared
                .iter()
                .map(|p| {
                    PropertyDescriptor::new(p.name.clone(), p.name.clone(), p.value_type)
                        .with_category("Script")
                })
                .collect()
        })
        .unwrap_or_default()
    }
}

struct ScriptAccessor;

impl PropertyAccessor<NodeRef, LoaderContext> for ScriptAccessor {
    fn get_value(
        &self,
        object: &NodeRef,
        property: &str,
        _world: &LoaderContext,
    ) -> Result<PropertyValue, PropertyError> {
        let (value_type, default) = declared(object, property)?;
        Ok(stored(object, property)
            .and_then(|text| PropertyValue::parse_text(value_type, &text).ok())
            .unwrap_or(default))
    }

    fn set_value(
        &self,
        object: &NodeRef,
        property: &str,
        update: &ValueUpdate,
        world: &LoaderContext,
    ) -> Result<(), PropertyError> {
        let current = self.get_value(object, property, world)?;
        let text = merge(property, &current, update)?.to_text();
        let slot = writer(object).ok_or_else(|| PropertyError::NotEditable(property.to_string()))?;
        slot.with_table(|table| table.insert(property.to_string(), text))
            .ok_or_else(|| PropertyError::NotEditable(property.to_string()))?;

        slot.owner.notify_change();
        object.notify_change();
        Ok(())
    }

    fn is_editable(&self, object: &NodeRef, _property: &str, _world: &LoaderContext) -> bool {
        writer(object).is_some()
    }

    fn is_overridden(&self, object: &NodeRef, property: &str, _world: &LoaderContext) -> bool {
        writer(object).map_or(false, |slot| slot.get(property).is_some())
    }

    fn reset_value(&self, object: &NodeRef, property: &str, _world: &LoaderContext) -> Result<(), PropertyError> {
        let slot = writer(object).ok_or_else(|| PropertyError::NotEditable(property.to_string()))?;
        slot.with_table(|table| table.shift_remove(property));
        slot.owner.notify_change();
        object.notify_change();
        Ok(())
    }
}

/// Reports stored values that do not parse as the declared type
struct StoredValueParses;

impl Validator<NodeRef, LoaderContext> for StoredValueParses {
    fn name(&self) -> &'static str {
        "stored-value-parses"
    }

    fn validate(&self, object: &NodeRef, property: &str, _value: &PropertyValue, _world: &LoaderContext) -> Status {
        let Ok((value_type, _)) = declared(object, property) else {
            return Status::ok();
        };
        match stored(object, property) {
            Some(text) if PropertyValue::parse_text(value_type, &text).is_err() => {
                Status::error(format!("'{}' has an invalid value '{}'", property, text))
            }
            _ => Status::ok(),
        }
    }
}

struct ScriptValidators;

impl DynamicValidators<NodeRef, LoaderContext> for ScriptValidators {
    fn validators(
        &self,
        _object: &NodeRef,
        _property: &str,
        _world: &LoaderContext,
    ) -> Vec<Rc<dyn Validator<NodeRef, LoaderContext>>> {
        vec![Rc::new(StoredValueParses)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::property_model;
    use scened_common::MockFileSystem;
    use scened_properties::Severity;

    fn context() -> Rc<LoaderContext> {
        let fs = MockFileSystem::new();
        fs.add_file("/p.script", "go.property(\"speed\", 1)\ngo.property(\"dir\", vmath.vector3(0, 1, 0))\n");
        fs.add_file(
            "/p.go",
            "components {\n  id: \"script\"\n  component: \"/p.script\"\n  properties {\n    id: \"speed\"\n    value: \"2\"\n  }\n}\n",
        );
        fs.add_file("/sub.collection", "instances {\n  id: \"c1\"\n  prototype: \"/p.go\"\n}\n");
        fs.add_file(
            "/main.collection",
            "instances {\n  id: \"a\"\n  prototype: \"/p.go\"\n}\ncollection_instances {\n  id: \"b\"\n  collection: \"/sub.collection\"\n}\n",
        );
        Rc::new(LoaderContext::new(Rc::new(fs)).unwrap())
    }

    #[test]
    fn test_every_kind_is_registered() {
        let registry = registry().unwrap();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds.len(), 8);
        let ids: Vec<_> = registry
            .introspect(kinds::GAME_OBJECT_INSTANCE)
            .unwrap()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["id", "prototype", "position", "rotation", "scale"]);
    }

    #[test]
    fn test_prototype_value_is_inherited_then_overridden() {
        let ctx = context();
        let root = ctx.load_node("/main.collection").unwrap();
        let script = root.find_child("a").unwrap().find_child("script").unwrap();
        let model = property_model(&ctx, &script).unwrap();

        assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(2.0));
        assert!(!model.is_editable("component"));
        assert!(model.is_editable("speed"));
        assert!(!model.is_overridden("speed"));

        let mut op = model.set("speed", PropertyValue::Number(10.0)).unwrap().unwrap();
        op.execute().unwrap();
        let a = root.find_child("a").unwrap();
        assert_eq!(a.borrow().kind().overrides().unwrap()[&OverrideKey::component("script")]["speed"], "10");
        assert!(model.is_overridden("speed"));

        op.undo().unwrap();
        assert!(a.borrow().kind().overrides().unwrap().is_empty());
        assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(2.0));
    }

    #[test]
    fn test_collection_instance_owns_nested_overrides() {
        let ctx = context();
        let root = ctx.load_node("/main.collection").unwrap();
        let b = root.find_child("b").unwrap();
        let script = b.find_child("c1").unwrap().find_child("script").unwrap();
        let model = property_model(&ctx, &script).unwrap();

        let mut op = model.set("dir", ValueUpdate::Components([Some(5.0), None, None, None])).unwrap().unwrap();
        op.execute().unwrap();
        assert_eq!(b.borrow().kind().overrides().unwrap()[&OverrideKey::nested("c1", "script")]["dir"], "5, 1, 0");
        assert_eq!(model.value("dir").unwrap(), PropertyValue::Vector3([5.0, 1.0, 0.0]));
    }

    #[test]
    fn test_locked_static_properties_are_read_only() {
        let ctx = context();
        let root = ctx.load_node("/main.collection").unwrap();
        let c1 = root.find_child("b").unwrap().find_child("c1").unwrap();
        let model = property_model(&ctx, &c1).unwrap();
        assert!(!model.is_editable("position"));
        assert!(matches!(
            model.set("id", PropertyValue::Text("x".into())),
            Err(PropertyError::NotEditable(_))
        ));
    }

    #[test]
    fn test_invalid_stored_value_is_reported() {
        let ctx = context();
        let root = ctx.load_node("/main.collection").unwrap();
        let a = root.find_child("a").unwrap();
        if let Some(overrides) = a.borrow_mut().kind_mut().overrides_mut() {
            overrides.entry(OverrideKey::component("script")).or_default().insert("speed".into(), "fast".into());
        }
        let script = a.find_child("script").unwrap();
        let model = property_model(&ctx, &script).unwrap();

        assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(1.0));
        let status = model.property_status("speed");
        assert_eq!(status.severity, Severity::Error);
        assert_eq!(status.messages(), vec!["'speed' has an invalid value 'fast'"]);
    }

    #[test]
    fn test_layer_z_resorts_grid() {
        let ctx = context();
        let grid = ctx
            .load_node_from_bytes(
                "tilegrid",
                b"layers {\n  id: \"a\"\n  z: 0.0\n}\nlayers {\n  id: \"b\"\n  z: 0.5\n}\n",
            )
            .unwrap();
        let a = grid.find_child("a").unwrap();
        let model = property_model(&ctx, &a).unwrap();
        model.set("z", PropertyValue::Number(0.9)).unwrap().unwrap().execute().unwrap();

        let ids: Vec<_> = grid.children().iter().filter_map(NodeRef::id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(model.options("z"), Vec::<String>::new());
    }

    #[test]
    fn test_enum_options_and_invalid_choice() {
        let ctx = context();
        let shape = ctx.load_node_from_template("collisionshape").unwrap();
        let model = property_model(&ctx, &shape).unwrap();
        assert_eq!(model.options("shape_type").len(), 3);
        assert!(!model.is_visible("id"));

        let mut op = model.set("shape_type", PropertyValue::Enum("TYPE_CONE".into())).unwrap().unwrap();
        assert!(op.execute().is_err());
    }
}
