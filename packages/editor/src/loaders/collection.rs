use super::{
    declared_type, property_message, read_transform, required_str, write_transform,
};
use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::node::{
    kinds, Collection, CollectionInstance, GameObjectInstance, NodeFlags, NodeKind, NodeRef,
    OverrideKey, Overrides,
};
use crate::reload::reload_reference;
use crate::types::{NodeLoader, Progress};
use indexmap::IndexMap;
use scened_common::normalize_resource_path;
use scened_parser::{serialize, Message};
use tracing::warn;

/// `.collection` documents: game object instances, embedded game objects
/// and nested collection instances
pub struct CollectionLoader;

impl NodeLoader for CollectionLoader {
    fn load(&self, ctx: &LoaderContext, message: &Message) -> Result<NodeRef, LoadError> {
        let root = NodeRef::new(NodeKind::Collection(Collection {
            name: message.get_str("name").unwrap_or_default().to_string(),
            scale_along_z: message.get_bool("scale_along_z").unwrap_or(false),
        }));

        let mut entries: Vec<(NodeRef, Vec<String>)> = Vec::new();

        for entry in message.messages("instances") {
            let node = NodeRef::new(NodeKind::GameObjectInstance(GameObjectInstance {
                id: required_str(entry, "id", "instances")?,
                prototype: normalize_resource_path(&required_str(entry, "prototype", "instances")?),
                overrides: read_component_properties(entry)?,
                load_error: None,
            }));
            *node.borrow_mut().transform_mut() = read_transform(entry);
            entries.push((node, children_of(entry)));
        }

        for entry in message.messages("embedded_instances") {
            let id = required_str(entry, "id", "embedded_instances")?;
            let data = entry.get_str("data").unwrap_or_default();
            let node = ctx.load_node_from_bytes("go", data.as_bytes())?;
            {
                let mut n = node.borrow_mut();
                n.kind_mut().set_id(id);
                *n.transform_mut() = read_transform(entry);
            }
            entries.push((node, children_of(entry)));
        }

        let mut collection_instances = Vec::new();
        for entry in message.messages("collection_instances") {
            let node = NodeRef::new(NodeKind::CollectionInstance(CollectionInstance {
                id: required_str(entry, "id", "collection_instances")?,
                collection: normalize_resource_path(&required_str(
                    entry,
                    "collection",
                    "collection_instances",
                )?),
                overrides: read_instance_properties(entry)?,
                load_error: None,
            }));
            *node.borrow_mut().transform_mut() = read_transform(entry);
            collection_instances.push(node);
        }

        link(&root, &entries);
        for node in &collection_instances {
            root.attach(node, None);
        }

        // References are resolved once the tree is in place
        for node in root.descendants() {
            if node.borrow().kind().is_reference() {
                reload_reference(&node, ctx);
            }
        }

        Ok(root)
    }

    fn build_message(
        &self,
        ctx: &LoaderContext,
        node: &NodeRef,
        progress: &Progress,
    ) -> Result<Message, LoadError> {
        let collection = match node.borrow().kind() {
            NodeKind::Collection(collection) => collection.clone(),
            other => {
                return Err(LoadError::WrongKind {
                    path: "collection".into(),
                    found: other.name(),
                    expected: kinds::COLLECTION.into(),
                })
            }
        };

        let mut builder = Builder::default();
        for child in node.children() {
            builder.visit(ctx, &child, progress)?;
        }

        let mut message = Message::new().with_str("name", collection.name);
        message.push_i64("scale_along_z", i64::from(collection.scale_along_z));
        for (field, mut entries) in [
            ("instances", builder.instances),
            ("embedded_instances", builder.embedded),
            ("collection_instances", builder.collections),
        ] {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, entry) in entries {
                message.push_message(field, entry);
            }
        }
        Ok(message)
    }
}

fn children_of(entry: &Message) -> Vec<String> {
    entry.strings("children").map(str::to_string).collect()
}

/// Attach instances to the instance listing them as a child, the rest to the root
fn link(root: &NodeRef, entries: &[(NodeRef, Vec<String>)]) {
    let mut linked = vec![false; entries.len()];
    for (parent, children) in entries {
        for child_id in children {
            let found = entries
                .iter()
                .position(|(n, _)| n.id().as_deref() == Some(child_id.as_str()));
            match found {
                Some(index) => {
                    let child = &entries[index].0;
                    parent.attach(child, None);
                    linked[index] = child.parent().as_ref() == Some(parent);
                }
                None => warn!(child = %child_id, "Unknown child instance"),
            }
        }
    }
    for (index, (node, _)) in entries.iter().enumerate() {
        if !linked[index] {
            root.attach(node, None);
        }
    }
}

/// `component_properties { id properties { id value } }`, keyed by component id
fn read_component_properties(entry: &Message) -> Result<Overrides, LoadError> {
    let mut overrides = Overrides::new();
    for component in entry.messages("component_properties") {
        let id = required_str(component, "id", "component_properties")?;
        let values = overrides.entry(OverrideKey::component(id)).or_default();
        read_property_values(component, values)?;
    }
    Ok(overrides)
}

/// `instance_properties { id properties { id properties { id value } } }`,
/// keyed by game object id path and component id
fn read_instance_properties(entry: &Message) -> Result<Overrides, LoadError> {
    let mut overrides = Overrides::new();
    for instance in entry.messages("instance_properties") {
        let path = required_str(instance, "id", "instance_properties")?;
        for component in instance.messages("properties") {
            let id = required_str(component, "id", "instance_properties.properties")?;
            let values = overrides
                .entry(OverrideKey::nested(path.as_str(), id))
                .or_default();
            read_property_values(component, values)?;
        }
    }
    Ok(overrides)
}

fn read_property_values(
    owner: &Message,
    values: &mut IndexMap<String, String>,
) -> Result<(), LoadError> {
    for property in owner.messages("properties") {
        let id = required_str(property, "id", "properties")?;
        let value = property.get_str("value").unwrap_or_default().to_string();
        values.entry(id).or_insert(value);
    }
    Ok(())
}

#[derive(Default)]
struct Builder {
    instances: Vec<(String, Message)>,
    embedded: Vec<(String, Message)>,
    collections: Vec<(String, Message)>,
}

impl Builder {
    fn visit(&mut self, ctx: &LoaderContext, node: &NodeRef, progress: &Progress) -> Result<(), LoadError> {
        if node.has_flag(NodeFlags::LOCKED) || node.borrow().kind().is_component() {
            return Ok(());
        }
        progress.check()?;

        let (kind, transform) = {
            let n = node.borrow();
            (n.kind().clone(), *n.transform())
        };
        let instance_children: Vec<NodeRef> = node
            .children()
            .into_iter()
            .filter(|c| !c.has_flag(NodeFlags::LOCKED) && !c.borrow().kind().is_component())
            .collect();

        match kind {
            NodeKind::GameObjectInstance(instance) => {
                let mut entry = Message::new()
                    .with_str("id", instance.id.as_str())
                    .with_str("prototype", instance.prototype.as_str());
                push_children(&mut entry, &instance_children);
                write_transform(&mut entry, &transform, true);
                for (key, values) in instance.overrides.iter().filter(|(_, v)| !v.is_empty()) {
                    let component = key.component.as_str();
                    let mut properties = Message::new().with_str("id", component);
                    for (id, value) in values {
                        let value_type = declared_type(node, component, id);
                        properties.push_message("properties", property_message(id, value, value_type));
                    }
                    entry.push_message("component_properties", properties);
                }
                self.instances.push((instance.id, entry));
            }
            NodeKind::GameObject(go) => {
                let id = go.id.unwrap_or_default();
                let data = serialize(&ctx.build_node_message(node, progress)?);
                let mut entry = Message::new()
                    .with_str("id", id.as_str())
                    .with_str("data", data);
                push_children(&mut entry, &instance_children);
                write_transform(&mut entry, &transform, true);
                self.embedded.push((id, entry));
            }
            NodeKind::CollectionInstance(instance) => {
                let mut entry = Message::new()
                    .with_str("id", instance.id.as_str())
                    .with_str("collection", instance.collection.as_str());
                write_transform(&mut entry, &transform, true);
                for message in instance_properties(node, &instance.overrides) {
                    entry.push_message("instance_properties", message);
                }
                self.collections.push((instance.id, entry));
                return Ok(());
            }
            _ => {}
        }

        for child in &instance_children {
            self.visit(ctx, child, progress)?;
        }
        Ok(())
    }
}

fn push_children(entry: &mut Message, children: &[NodeRef]) {
    for child in children {
        if let Some(id) = child.id() {
            entry.push_str("children", id);
        }
    }
}

/// One `instance_properties` entry per game object, in first-override order
fn instance_properties(instance: &NodeRef, overrides: &Overrides) -> Vec<Message> {
    let mut groups: IndexMap<&str, Vec<Message>> = IndexMap::new();
    for (key, values) in overrides.iter().filter(|(_, v)| !v.is_empty()) {
        let Some(path) = key.instance.as_deref() else {
            continue;
        };
        let target = game_object_at(instance, path);
        let mut component = Message::new().with_str("id", key.component.as_str());
        for (id, value) in values {
            let value_type = target
                .as_ref()
                .and_then(|go| declared_type(go, &key.component, id));
            component.push_message("properties", property_message(id, value, value_type));
        }
        groups.entry(path).or_default().push(component);
    }

    groups
        .into_iter()
        .map(|(path, components)| {
            let mut message = Message::new().with_str("id", path);
            for component in components {
                message.push_message("properties", component);
            }
            message
        })
        .collect()
}

/// Game object of a collection instance's subtree with the given id path
fn game_object_at(instance: &NodeRef, path: &str) -> Option<NodeRef> {
    instance.descendants().into_iter().skip(1).find(|n| {
        !n.borrow().kind().is_component() && n.instance_path_from(instance).as_deref() == Some(path)
    })
}
