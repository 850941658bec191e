//! Loaders of the built-in document types, and the message helpers they share

mod collection;
mod collision_shape;
mod game_object;
mod tile_grid;

pub use collection::CollectionLoader;
pub use collision_shape::CollisionShapeLoader;
pub use game_object::GameObjectLoader;
pub use tile_grid::TileGridLoader;

use crate::errors::LoadError;
use crate::node::{kinds, NodeRef, Transform};
use crate::script::type_name;
use crate::types::NodeType;
use scened_parser::Message;
use scened_properties::ValueType;
use std::rc::Rc;

const COLLECTION_TEMPLATE: &str = "name: \"default\"\nscale_along_z: 0\n";
const GAME_OBJECT_TEMPLATE: &str = "";
const COLLISION_SHAPE_TEMPLATE: &str = "shape_type: TYPE_BOX\ndimensions {\n  x: 1.0\n  y: 1.0\n  z: 1.0\n}\n";
const TILE_GRID_TEMPLATE: &str = "tile_set: \"\"\nblend_mode: BLEND_MODE_ALPHA\nlayers {\n  id: \"layer1\"\n  z: 0.0\n  is_visible: 1\n}\n";

pub(crate) fn default_types() -> Vec<NodeType> {
    vec![
        NodeType {
            extension: "collection".into(),
            kind: kinds::COLLECTION,
            display_name: "Collection".into(),
            loader: Rc::new(CollectionLoader),
            template: COLLECTION_TEMPLATE.into(),
            reference_kinds: vec![kinds::GAME_OBJECT, kinds::COLLECTION],
        },
        NodeType {
            extension: "go".into(),
            kind: kinds::GAME_OBJECT,
            display_name: "Game Object".into(),
            loader: Rc::new(GameObjectLoader),
            template: GAME_OBJECT_TEMPLATE.into(),
            reference_kinds: Vec::new(),
        },
        NodeType {
            extension: "collisionshape".into(),
            kind: kinds::COLLISION_SHAPE,
            display_name: "Collision Shape".into(),
            loader: Rc::new(CollisionShapeLoader),
            template: COLLISION_SHAPE_TEMPLATE.into(),
            reference_kinds: Vec::new(),
        },
        NodeType {
            extension: "tilegrid".into(),
            kind: kinds::TILE_GRID,
            display_name: "Tile Grid".into(),
            loader: Rc::new(TileGridLoader),
            template: TILE_GRID_TEMPLATE.into(),
            reference_kinds: Vec::new(),
        },
    ]
}

pub(crate) fn required_str(message: &Message, field: &str, context: &str) -> Result<String, LoadError> {
    message
        .get_str(field)
        .map(str::to_string)
        .ok_or_else(|| LoadError::missing_field(context, field))
}

/// String or identifier value, for enum fields
pub(crate) fn enum_value<'a>(message: &'a Message, field: &str) -> Option<&'a str> {
    message.get_ident(field).or_else(|| message.get_str(field))
}

pub(crate) fn read_vector3(message: Option<&Message>, default: [f64; 3]) -> [f64; 3] {
    match message {
        Some(m) => [
            m.get_f64("x").unwrap_or(default[0]),
            m.get_f64("y").unwrap_or(default[1]),
            m.get_f64("z").unwrap_or(default[2]),
        ],
        None => default,
    }
}

pub(crate) fn vector3_message(v: [f64; 3]) -> Message {
    Message::new()
        .with_f64("x", v[0])
        .with_f64("y", v[1])
        .with_f64("z", v[2])
}

fn read_quat(message: Option<&Message>) -> [f64; 4] {
    match message {
        Some(m) => [
            m.get_f64("x").unwrap_or(0.0),
            m.get_f64("y").unwrap_or(0.0),
            m.get_f64("z").unwrap_or(0.0),
            m.get_f64("w").unwrap_or(1.0),
        ],
        None => [0.0, 0.0, 0.0, 1.0],
    }
}

fn quat_message(q: [f64; 4]) -> Message {
    vector3_message([q[0], q[1], q[2]]).with_f64("w", q[3])
}

/// `position`, `rotation` and `scale3` (or a uniform `scale`)
pub(crate) fn read_transform(message: &Message) -> Transform {
    let scale = match message.get_message("scale3") {
        Some(scale3) => read_vector3(Some(scale3), [1.0; 3]),
        None => [message.get_f64("scale").unwrap_or(1.0); 3],
    };
    Transform {
        position: read_vector3(message.get_message("position"), [0.0; 3]),
        rotation: read_quat(message.get_message("rotation")),
        scale,
    }
}

pub(crate) fn write_transform(message: &mut Message, transform: &Transform, with_scale: bool) {
    message.push_message("position", vector3_message(transform.position));
    message.push_message("rotation", quat_message(transform.rotation));
    if with_scale {
        message.push_message("scale3", vector3_message(transform.scale));
    }
}

/// `properties { id value type }` entry of a component property
pub(crate) fn property_message(id: &str, value: &str, value_type: Option<ValueType>) -> Message {
    let mut message = Message::new().with_str("id", id).with_str("value", value);
    message.push_ident("type", type_name(value_type.unwrap_or(ValueType::Number)));
    message
}

/// Declared type of a property of the component child with id `component`
pub(crate) fn declared_type(owner: &NodeRef, component: &str, property: &str) -> Option<ValueType> {
    let child = owner.find_child(component)?;
    let node = child.borrow();
    match node.kind() {
        crate::node::NodeKind::ComponentRef(c) => c.declared(property).map(|p| p.value_type),
        _ => None,
    }
}
