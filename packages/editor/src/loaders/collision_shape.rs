use super::{enum_value, read_vector3, vector3_message};
use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::node::{CollisionShape, NodeKind, NodeRef, ShapeType};
use crate::types::{NodeLoader, Progress};
use scened_parser::Message;

/// `.collisionshape` documents
pub struct CollisionShapeLoader;

impl NodeLoader for CollisionShapeLoader {
    fn load(&self, _ctx: &LoaderContext, message: &Message) -> Result<NodeRef, LoadError> {
        let shape_type = match enum_value(message, "shape_type") {
            Some(text) => ShapeType::parse(text).ok_or_else(|| {
                LoadError::invalid_field("shape_type", format!("unknown shape '{}'", text))
            })?,
            None => ShapeType::default(),
        };

        Ok(NodeRef::new(NodeKind::CollisionShape(CollisionShape {
            id: None,
            shape_type,
            dimensions: read_vector3(message.get_message("dimensions"), [1.0; 3]),
        })))
    }

    fn build_message(
        &self,
        _ctx: &LoaderContext,
        node: &NodeRef,
        _progress: &Progress,
    ) -> Result<Message, LoadError> {
        let node = node.borrow();
        let NodeKind::CollisionShape(shape) = node.kind() else {
            return Err(LoadError::WrongKind {
                path: "collision shape".into(),
                found: node.kind().name(),
                expected: "collision_shape".into(),
            });
        };

        let mut message = Message::new();
        message.push_ident("shape_type", shape.shape_type.as_str());
        message.push_message("dimensions", vector3_message(shape.dimensions));
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scened_common::MockFileSystem;
    use std::rc::Rc;

    #[test]
    fn test_load_and_build() {
        let ctx = LoaderContext::new(Rc::new(MockFileSystem::new())).unwrap();
        let text = "shape_type: TYPE_CAPSULE\ndimensions {\n  x: 0.5\n  y: 2.0\n  z: 0.5\n}\n";
        let node = ctx.load_node_from_bytes("collisionshape", text.as_bytes()).unwrap();

        match node.borrow().kind() {
            NodeKind::CollisionShape(shape) => {
                assert_eq!(shape.shape_type, ShapeType::Capsule);
                assert_eq!(shape.dimensions, [0.5, 2.0, 0.5]);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(ctx.build_node_text(&node).unwrap(), text);
    }

    #[test]
    fn test_unknown_shape_is_rejected() {
        let ctx = LoaderContext::new(Rc::new(MockFileSystem::new())).unwrap();
        assert!(matches!(
            ctx.load_node_from_bytes("collisionshape", b"shape_type: TYPE_CONE\n"),
            Err(LoadError::InvalidField { .. })
        ));
    }
}
