use super::{property_message, read_transform, required_str, write_transform};
use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::node::{ComponentRef, GameObject, NodeKind, NodeRef};
use crate::types::{NodeLoader, Progress};
use indexmap::IndexMap;
use scened_common::normalize_resource_path;
use scened_parser::{serialize, Message};
use std::rc::Rc;
use tracing::warn;

/// `.go` documents: script components and embedded components
pub struct GameObjectLoader;

impl NodeLoader for GameObjectLoader {
    fn load(&self, ctx: &LoaderContext, message: &Message) -> Result<NodeRef, LoadError> {
        let root = NodeRef::new(NodeKind::GameObject(GameObject::default()));

        for entry in message.messages("components") {
            let component = load_component(ctx, entry)?;
            root.attach(&component, None);
        }

        for entry in message.messages("embedded_components") {
            let id = required_str(entry, "id", "embedded_components")?;
            let extension = required_str(entry, "type", "embedded_components")?;
            let data = entry.get_str("data").unwrap_or_default();

            let node = ctx.load_node_from_bytes(&extension, data.as_bytes())?;
            if !node.borrow().kind().is_component() {
                return Err(LoadError::WrongKind {
                    path: format!("embedded component '{}'", id),
                    found: node.kind_name(),
                    expected: "a component".into(),
                });
            }
            {
                let mut n = node.borrow_mut();
                n.kind_mut().set_id(id);
                *n.transform_mut() = read_transform(entry);
            }
            root.attach(&node, None);
        }

        Ok(root)
    }

    fn build_message(
        &self,
        ctx: &LoaderContext,
        node: &NodeRef,
        progress: &Progress,
    ) -> Result<Message, LoadError> {
        let mut message = Message::new();

        for child in node.children() {
            progress.check()?;
            let (kind, transform) = {
                let c = child.borrow();
                (c.kind().clone(), *c.transform())
            };
            match kind {
                NodeKind::ComponentRef(component) => {
                    let mut entry = Message::new()
                        .with_str("id", component.id.as_str())
                        .with_str("component", component.component.as_str());
                    write_transform(&mut entry, &transform, false);
                    for (id, value) in &component.properties {
                        let value_type = component.declared(id).map(|p| p.value_type);
                        entry.push_message("properties", property_message(id, value, value_type));
                    }
                    message.push_message("components", entry);
                }
                kind if kind.is_component() => {
                    let extension = ctx
                        .node_type_registry()
                        .node_type_for_kind(kind.name())
                        .map(|t| t.extension.clone())
                        .ok_or_else(|| LoadError::UnknownType(kind.name().to_string()))?;
                    let data = serialize(&ctx.build_node_message(&child, progress)?);

                    let mut entry = Message::new()
                        .with_str("id", kind.id().unwrap_or_default())
                        .with_str("type", extension)
                        .with_str("data", data);
                    write_transform(&mut entry, &transform, false);
                    message.push_message("embedded_components", entry);
                }
                // Child instances of embedded game objects belong to the collection
                _ => {}
            }
        }

        Ok(message)
    }
}

fn load_component(ctx: &LoaderContext, entry: &Message) -> Result<NodeRef, LoadError> {
    let id = required_str(entry, "id", "components")?;
    let path = normalize_resource_path(&required_str(entry, "component", "components")?);

    let mut properties = IndexMap::new();
    for property in entry.messages("properties") {
        let name = required_str(property, "id", "properties")?;
        let value = property.get_str("value").unwrap_or_default().to_string();
        properties.entry(name).or_insert(value);
    }

    let (declared, load_error) = match ctx.load_script(&path) {
        Ok(declared) => (declared, None),
        Err(err) => {
            warn!(path = %path, error = %err, "Failed to load script");
            (Rc::default(), Some(err.to_string()))
        }
    };

    let node = NodeRef::new(NodeKind::ComponentRef(ComponentRef {
        id,
        component: path,
        properties,
        declared,
        load_error,
    }));
    *node.borrow_mut().transform_mut() = read_transform(entry);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scened_common::MockFileSystem;
    use scened_properties::PropertyValue;

    const PLAYER: &str = r#"components {
  id: "script"
  component: "/main/player.script"
  properties {
    id: "speed"
    value: "10"
    type: PROPERTY_TYPE_NUMBER
  }
}
embedded_components {
  id: "body"
  type: "collisionshape"
  data: "shape_type: TYPE_SPHERE\ndimensions {\n  x: 2.0\n  y: 2.0\n  z: 2.0\n}\n"
  position {
    x: 1.0
    y: 0.0
    z: 0.0
  }
}
"#;

    fn context() -> LoaderContext {
        let fs = MockFileSystem::new();
        fs.add_file("/main/player.script", "go.property(\"speed\", 1)\n");
        fs.add_file("/main/player.go", PLAYER);
        LoaderContext::new(Rc::new(fs)).unwrap()
    }

    #[test]
    fn test_components_loaded_and_sorted() {
        let ctx = context();
        let go = ctx.load_node("/main/player.go").unwrap();

        let ids: Vec<_> = go.children().iter().filter_map(NodeRef::id).collect();
        assert_eq!(ids, vec!["body", "script"]);

        let script = go.find_child("script").unwrap();
        match script.borrow().kind() {
            NodeKind::ComponentRef(c) => {
                assert_eq!(c.properties["speed"], "10");
                assert_eq!(c.declared("speed").unwrap().default, PropertyValue::Number(1.0));
                assert!(c.load_error.is_none());
            }
            other => panic!("unexpected kind {:?}", other),
        }
        let body = go.find_child("body").unwrap();
        assert_eq!(body.borrow().transform().position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let ctx = context();
        let first = ctx.build_node_text(&ctx.load_node("/main/player.go").unwrap()).unwrap();
        let reloaded = ctx.load_node_from_bytes("go", first.as_bytes()).unwrap();
        assert_eq!(ctx.build_node_text(&reloaded).unwrap(), first);
    }

    #[test]
    fn test_missing_script_is_recorded() {
        let ctx = context();
        let go = ctx
            .load_node_from_bytes("go", b"components {\n  id: \"s\"\n  component: \"/none.script\"\n}\n")
            .unwrap();
        let child = go.find_child("s").unwrap();
        assert!(child.borrow().kind().load_error().is_some());
    }

    #[test]
    fn test_embedded_document_must_be_a_component() {
        let ctx = context();
        let text = b"embedded_components {\n  id: \"x\"\n  type: \"go\"\n  data: \"\"\n}\n";
        assert!(matches!(
            ctx.load_node_from_bytes("go", text),
            Err(LoadError::WrongKind { .. })
        ));
    }
}
