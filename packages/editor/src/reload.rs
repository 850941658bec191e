//! # Reference Reload
//!
//! Reference nodes (game object and collection instances) own a subtree
//! loaded from another document. Reloading replaces that subtree:
//!
//! 1. detach the children the reference owns
//! 2. load the referenced document through the loader context
//! 3. check its kind against the kinds the containing document may reference
//! 4. lock the loaded subtree and adopt its children
//! 5. drop overrides whose target no longer exists
//!
//! A failed load leaves the reference without children and records the
//! error on the node, where validation reports it. Overrides are kept so a
//! later successful reload can apply them again.

use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::node::{NodeFlags, NodeKind, NodeRef, OverrideKey};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument, warn};

/// Reload the document behind a reference node. Returns true on success.
#[instrument(skip_all, fields(kind = node.kind_name(), id = %node.id().unwrap_or_default()))]
pub fn reload_reference(node: &NodeRef, ctx: &LoaderContext) -> bool {
    let (path, target, owns_all_children) = {
        let n = node.borrow();
        let kind = n.kind();
        match (kind.reference_path(), kind.reference_target()) {
            (Some(path), Some(target)) => (
                path.to_string(),
                target,
                matches!(kind, NodeKind::CollectionInstance(_)),
            ),
            _ => return false,
        }
    };

    // Child instances of a game object instance belong to the containing document
    for child in node.take_children(|c| owns_all_children || c.has_flag(NodeFlags::LOCKED)) {
        child.dispose();
    }
    node.borrow_mut().kind_mut().set_load_error(None);

    if path.is_empty() {
        node.notify_change();
        return false;
    }

    let reloaded = match load_reference(node, ctx, &path, target) {
        Ok(loaded) => {
            loaded.set_flags_recursively(NodeFlags::LOCKED, true);
            for child in loaded.take_children(|_| true) {
                node.attach(&child, None);
            }
            loaded.dispose();
            reconcile_overrides(node);
            debug!(path = %path, children = node.child_count(), "Reloaded reference");
            true
        }
        Err(err) => {
            warn!(path = %path, error = %err, "Failed to reload reference");
            node.borrow_mut().kind_mut().set_load_error(Some(err.to_string()));
            false
        }
    };

    node.notify_change();
    reloaded
}

fn load_reference(
    node: &NodeRef,
    ctx: &LoaderContext,
    path: &str,
    target: &'static str,
) -> Result<NodeRef, LoadError> {
    let loaded = ctx.load_node(path)?;
    let found = loaded.kind_name();
    if found != target {
        return Err(LoadError::WrongKind {
            path: path.to_string(),
            found,
            expected: target.to_string(),
        });
    }

    let container = node.root().kind_name();
    if !ctx.node_type_registry().allows_reference(container, target) {
        return Err(LoadError::WrongKind {
            path: path.to_string(),
            found,
            expected: format!("a kind referenced by a {}", container),
        });
    }
    Ok(loaded)
}

/// Drop overrides of components that are no longer part of the loaded subtree
fn reconcile_overrides(node: &NodeRef) {
    let is_collection_instance = matches!(node.borrow().kind(), NodeKind::CollectionInstance(_));
    let present: HashSet<OverrideKey> = if is_collection_instance {
        node.descendants()
            .iter()
            .filter(|n| n.borrow().kind().is_component())
            .filter_map(|c| {
                let path = c.parent()?.instance_path_from(node)?;
                Some(OverrideKey::nested(path, c.id()?))
            })
            .collect()
    } else {
        node.children()
            .iter()
            .filter(|c| c.has_flag(NodeFlags::LOCKED) && c.borrow().kind().is_component())
            .filter_map(NodeRef::id)
            .map(OverrideKey::component)
            .collect()
    };

    let mut n = node.borrow_mut();
    if let Some(overrides) = n.kind_mut().overrides_mut() {
        overrides.retain(|key, _| {
            let keep = present.contains(key);
            if !keep {
                debug!(key = %key, "Dropping overrides of a vanished component");
            }
            keep
        });
    }
}

/// Re-scan the script of a component. Returns true on success.
pub fn reload_component(node: &NodeRef, ctx: &LoaderContext) -> bool {
    let path = match node.borrow().kind() {
        NodeKind::ComponentRef(component) => component.component.clone(),
        _ => return false,
    };

    let result = ctx.load_script(&path);
    {
        let mut n = node.borrow_mut();
        if let NodeKind::ComponentRef(component) = n.kind_mut() {
            match &result {
                Ok(declared) => {
                    component.declared = declared.clone();
                    component.load_error = None;
                }
                Err(err) => {
                    warn!(path = %path, error = %err, "Failed to reload script");
                    component.declared = Default::default();
                    component.load_error = Some(err.to_string());
                }
            }
        }
    }
    node.notify_change();
    result.is_ok()
}

/// Reload every node backed by one of `changed`, in one pre-order walk.
/// The subtree of a reloaded reference is fresh and is not visited again.
/// Returns whether anything was reloaded.
#[instrument(skip_all, fields(changed = changed.len()))]
pub fn reload_changed(root: &NodeRef, ctx: &LoaderContext, changed: &BTreeSet<String>) -> bool {
    let backing = |node: &NodeRef| match node.borrow().kind() {
        NodeKind::GameObjectInstance(i) => Some(i.prototype.clone()),
        NodeKind::CollectionInstance(i) => Some(i.collection.clone()),
        NodeKind::ComponentRef(c) => Some(c.component.clone()),
        _ => None,
    };

    let mut reloaded = false;
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let Some(path) = backing(&node).filter(|p| changed.contains(p)) {
            debug!(path = %path, "Reloading changed resource");
            if node.borrow().kind().is_reference() {
                reload_reference(&node, ctx);
            } else {
                reload_component(&node, ctx);
            }
            reloaded = true;
            continue;
        }
        stack.extend(node.children().into_iter().rev());
    }
    reloaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use scened_common::MockFileSystem;
    use std::rc::Rc;

    fn setup() -> (Rc<MockFileSystem>, LoaderContext) {
        let fs = Rc::new(MockFileSystem::new());
        fs.add_file("/a.script", "go.property(\"speed\", 1)\n");
        fs.add_file("/a.go", "components {\n  id: \"script\"\n  component: \"/a.script\"\n}\n");
        fs.add_file("/b.go", "components {\n  id: \"logic\"\n  component: \"/a.script\"\n}\n");
        let ctx = LoaderContext::new(fs.clone()).unwrap();
        (fs, ctx)
    }

    fn instance(ctx: &LoaderContext, prototype: &str) -> (NodeRef, NodeRef) {
        let text = format!(
            "instances {{\n  id: \"hero\"\n  prototype: \"{}\"\n  component_properties {{\n    id: \"script\"\n    properties {{\n      id: \"speed\"\n      value: \"3\"\n    }}\n  }}\n}}\n",
            prototype
        );
        let root = ctx.load_node_from_bytes("collection", text.as_bytes()).unwrap();
        let hero = root.find_child("hero").unwrap();
        (root, hero)
    }

    #[test]
    fn test_reload_is_idempotent() {
        let (_, ctx) = setup();
        let (_root, hero) = instance(&ctx, "/a.go");
        assert!(reload_reference(&hero, &ctx));
        assert!(reload_reference(&hero, &ctx));
        assert_eq!(hero.child_count(), 1);
        assert!(hero.borrow().kind().overrides().unwrap().contains_key(&OverrideKey::component("script")));
    }

    #[test]
    fn test_path_change_drops_vanished_overrides() {
        let (_, ctx) = setup();
        let (_root, hero) = instance(&ctx, "/a.go");
        if let NodeKind::GameObjectInstance(i) = hero.borrow_mut().kind_mut() {
            i.prototype = "/b.go".into();
        }
        assert!(reload_reference(&hero, &ctx));
        assert_eq!(hero.find_child("logic").map(|c| c.has_flag(NodeFlags::LOCKED)), Some(true));
        assert!(hero.borrow().kind().overrides().unwrap().is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_overrides() {
        let (fs, ctx) = setup();
        let (_root, hero) = instance(&ctx, "/a.go");
        fs.remove_file("/a.go");

        assert!(!reload_reference(&hero, &ctx));
        assert_eq!(hero.child_count(), 0);
        assert!(hero.borrow().kind().load_error().is_some());
        assert!(hero.borrow().kind().overrides().unwrap().contains_key(&OverrideKey::component("script")));

        fs.add_file("/a.go", "components {\n  id: \"script\"\n  component: \"/a.script\"\n}\n");
        assert!(reload_reference(&hero, &ctx));
        assert!(hero.borrow().kind().load_error().is_none());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let (fs, ctx) = setup();
        fs.add_file("/shape.collisionshape", "shape_type: TYPE_BOX\n");
        let (_root, hero) = instance(&ctx, "/shape.collisionshape");
        assert!(hero.borrow().kind().load_error().unwrap().contains("expected game_object"));
    }

    #[test]
    fn test_changed_walk_reloads_scripts() {
        let (fs, ctx) = setup();
        let (root, hero) = instance(&ctx, "/a.go");
        fs.add_file("/a.script", "go.property(\"speed\", 1)\ngo.property(\"jump\", 2)\n");
        ctx.invalidate("/a.script");

        let changed: BTreeSet<String> = ["/a.script".to_string()].into();
        assert!(reload_changed(&root, &ctx, &changed));

        let script = hero.find_child("script").unwrap();
        match script.borrow().kind() {
            NodeKind::ComponentRef(c) => assert_eq!(c.declared.len(), 2),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(!reload_changed(&root, &ctx, &BTreeSet::new()));
    }
}
