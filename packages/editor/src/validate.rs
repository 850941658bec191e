//! Whole-tree validation.
//!
//! Every node's status is the merge of its children's statuses, the status
//! of its properties and the structural checks of its kind. The result is
//! cached on the node for views to display.

use crate::context::{property_model, LoaderContext};
use crate::node::{NodeKind, NodeRef};
use scened_properties::Status;
use std::collections::HashSet;
use std::rc::Rc;

/// Recompute and cache the status of `node` and everything below it
pub fn update_status(node: &NodeRef, ctx: &Rc<LoaderContext>) -> Status {
    let mut statuses: Vec<Status> = node
        .children()
        .iter()
        .map(|child| update_status(child, ctx))
        .collect();

    if let Ok(model) = property_model(ctx, node) {
        statuses.push(model.status());
    }
    statuses.extend(kind_checks(node));

    let status = Status::merge(statuses);
    node.set_status(status.clone());
    status
}

fn kind_checks(node: &NodeRef) -> Vec<Status> {
    let mut statuses = Vec::new();
    {
        let n = node.borrow();
        match n.kind() {
            NodeKind::GameObjectInstance(i) => {
                if let Some(error) = &i.load_error {
                    statuses.push(Status::error(format!("Invalid reference: {}", error)).with_property("prototype"));
                }
            }
            NodeKind::CollectionInstance(i) => {
                if let Some(error) = &i.load_error {
                    statuses.push(Status::error(format!("Invalid reference: {}", error)).with_property("collection"));
                }
            }
            NodeKind::ComponentRef(c) => {
                if let Some(error) = &c.load_error {
                    statuses.push(Status::error(format!("Script could not be loaded: {}", error)).with_property("component"));
                }
            }
            _ => {}
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in node.children().iter().filter_map(NodeRef::id) {
        if !seen.insert(id.clone()) && reported.insert(id.clone()) {
            statuses.push(Status::error(format!("Id '{}' is used more than once", id)));
        }
    }
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use scened_common::MockFileSystem;
    use scened_properties::Severity;

    fn context(fs: MockFileSystem) -> Rc<LoaderContext> {
        Rc::new(LoaderContext::new(Rc::new(fs)).unwrap())
    }

    #[test]
    fn test_valid_tree_is_ok() {
        let fs = MockFileSystem::new();
        fs.add_file("/e.go", "");
        fs.add_file("/m.collection", "instances {\n  id: \"a\"\n  prototype: \"/e.go\"\n}\n");
        let ctx = context(fs);
        let root = ctx.load_node("/m.collection").unwrap();
        assert!(update_status(&root, &ctx).is_ok());
    }

    #[test]
    fn test_broken_reference_is_invalid() {
        let fs = MockFileSystem::new();
        fs.add_file("/m.collection", "instances {\n  id: \"a\"\n  prototype: \"/missing.go\"\n}\n");
        let ctx = context(fs);
        let root = ctx.load_node("/m.collection").unwrap();

        let status = update_status(&root, &ctx);
        assert_eq!(status.severity, Severity::Error);
        assert!(status.messages().iter().any(|m| m.starts_with("Invalid reference")));
        assert!(status.messages().contains(&"'/missing.go' could not be found"));

        let a = root.find_child("a").unwrap();
        assert_eq!(a.status().severity, Severity::Error);
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/e.go", "");
        fs.add_file(
            "/m.collection",
            "instances {\n  id: \"a\"\n  prototype: \"/e.go\"\n}\ninstances {\n  id: \"a\"\n  prototype: \"/e.go\"\n}\ninstances {\n  id: \"a\"\n  prototype: \"/e.go\"\n}\n",
        );
        let ctx = context(fs);
        let root = ctx.load_node("/m.collection").unwrap();
        let status = update_status(&root, &ctx);
        assert_eq!(status.messages(), vec!["Id 'a' is used more than once"]);
    }

    #[test]
    fn test_every_failing_property_is_reported() {
        let ctx = context(MockFileSystem::new());
        let grid = ctx
            .load_node_from_bytes("tilegrid", b"layers {\n  id: \"\"\n  z: 2.0\n}\n")
            .unwrap();
        let status = update_status(&grid, &ctx);
        // empty tile set, empty layer id, z out of range
        assert_eq!(status.messages().len(), 3);
    }
}
