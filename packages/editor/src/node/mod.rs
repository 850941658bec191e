//! # Node Tree
//!
//! Generic parent/child ownership for document nodes.
//!
//! ## Design
//!
//! - A [`NodeRef`] is a shared handle to a node; children are owned by their
//!   parent's child list, parents and the owning model are weak links
//! - A node is in exactly one parent's child list, or is a root, or is detached
//! - Structural changes notify the owning model once per logical change
//! - Children are re-sorted with the parent kind's ordering after every
//!   structural change, never on read

mod kind;

pub use kind::*;

use bitflags::bitflags;
use scened_properties::Status;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::rc::{Rc, Weak};
use tracing::warn;

bitflags! {
    /// Capabilities of a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Position and rotation can be edited
        const TRANSFORMABLE = 1 << 0;
        /// Scale can be edited
        const SCALABLE = 1 << 1;
        /// Part of a referenced document; static properties are read-only
        const LOCKED = 1 << 2;
        const INVISIBLE = 1 << 3;
    }
}

/// Local transform. Rotation is a quaternion (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

/// Change sink shared by every node of one document
#[derive(Debug, Default)]
pub struct ModelCore {
    changed: RefCell<Vec<WeakNodeRef>>,
    change_count: Cell<u64>,
}

impl ModelCore {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn node_changed(&self, node: &NodeRef) {
        self.change_count.set(self.change_count.get() + 1);
        let mut changed = self.changed.borrow_mut();
        if !changed.iter().any(|w| w.is(node)) {
            changed.push(node.downgrade());
        }
    }

    /// Total number of notifications received
    pub fn change_count(&self) -> u64 {
        self.change_count.get()
    }

    /// Drain the nodes changed since the last call
    pub fn take_changes(&self) -> Vec<NodeRef> {
        self.changed
            .borrow_mut()
            .drain(..)
            .filter_map(|w| w.upgrade())
            .collect()
    }
}

#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    flags: NodeFlags,
    transform: Transform,
    children: Vec<NodeRef>,
    parent: Weak<RefCell<Node>>,
    model: Weak<ModelCore>,
    /// Position in the former parent, used when the node is added back
    child_index: Option<usize>,
    status: Status,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn status(&self) -> &Status {
        &self.status
    }
}

/// Shared handle to a node
#[derive(Debug, Clone)]
pub struct NodeRef(Rc<RefCell<Node>>);

/// Non-owning handle to a node
#[derive(Debug, Clone, Default)]
pub struct WeakNodeRef(Weak<RefCell<Node>>);

impl WeakNodeRef {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }

    pub fn is(&self, node: &NodeRef) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&node.0))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

impl NodeRef {
    pub fn new(kind: NodeKind) -> Self {
        let flags = match &kind {
            NodeKind::GameObject(_)
            | NodeKind::GameObjectInstance(_)
            | NodeKind::CollectionInstance(_)
            | NodeKind::ComponentRef(_)
            | NodeKind::CollisionShape(_) => NodeFlags::TRANSFORMABLE | NodeFlags::SCALABLE,
            _ => NodeFlags::empty(),
        };
        NodeRef(Rc::new(RefCell::new(Node {
            kind,
            flags,
            transform: Transform::default(),
            children: Vec::new(),
            parent: Weak::new(),
            model: Weak::new(),
            child_index: None,
            status: Status::ok(),
        })))
    }

    pub fn borrow(&self) -> Ref<'_, Node> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    pub fn downgrade(&self) -> WeakNodeRef {
        WeakNodeRef(Rc::downgrade(&self.0))
    }

    pub fn kind_name(&self) -> &'static str {
        self.0.borrow().kind.name()
    }

    pub fn id(&self) -> Option<String> {
        self.0.borrow().kind.id().map(str::to_string)
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.0.borrow().parent.upgrade().map(NodeRef)
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn child_index(&self) -> Option<usize> {
        self.0.borrow().child_index
    }

    pub fn has_children(&self) -> bool {
        !self.0.borrow().children.is_empty()
    }

    /// Child with the given id
    pub fn find_child(&self, id: &str) -> Option<NodeRef> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|c| c.0.borrow().kind.id() == Some(id))
            .cloned()
    }

    /// The node and its descendants, pre-order
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<NodeRef>) {
        out.push(self.clone());
        for child in self.children() {
            child.collect_descendants(out);
        }
    }

    /// Topmost ancestor, or the node itself
    pub fn root(&self) -> NodeRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// True when `ancestor` is this node or one of its ancestors
    pub fn is_self_or_descendant_of(&self, ancestor: &NodeRef) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if &node == ancestor {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Id path of this node as seen from `ancestor`: the ids of the
    /// collection instances in between, then the node's own id, joined by `/`
    pub fn instance_path_from(&self, ancestor: &NodeRef) -> Option<String> {
        let mut segments = vec![self.id()?];
        let mut current = self.parent()?;
        while &current != ancestor {
            if matches!(current.borrow().kind, NodeKind::CollectionInstance(_)) {
                segments.push(current.id()?);
            }
            current = current.parent()?;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    pub fn has_flag(&self, flag: NodeFlags) -> bool {
        self.0.borrow().flags.contains(flag)
    }

    pub fn set_flag(&self, flag: NodeFlags, on: bool) {
        self.0.borrow_mut().flags.set(flag, on);
    }

    pub fn set_flags_recursively(&self, flag: NodeFlags, on: bool) {
        self.set_flag(flag, on);
        for child in self.children() {
            child.set_flags_recursively(flag, on);
        }
    }

    pub fn status(&self) -> Status {
        self.0.borrow().status.clone()
    }

    pub fn set_status(&self, status: Status) {
        self.0.borrow_mut().status = status;
    }

    pub fn model(&self) -> Option<Rc<ModelCore>> {
        self.0.borrow().model.upgrade()
    }

    /// Attach the subtree to a model, or detach it with `None`. Silent.
    pub fn set_model(&self, model: Option<&Rc<ModelCore>>) {
        self.0.borrow_mut().model = model.map(Rc::downgrade).unwrap_or_default();
        for child in self.children() {
            child.set_model(model);
        }
    }

    /// Report a change of this node to its model
    pub fn notify_change(&self) {
        if let Some(model) = self.model() {
            model.node_changed(self);
        }
    }

    /// Append a child, or put it back at its remembered index
    pub fn add_child(&self, child: &NodeRef) {
        let index = child.child_index();
        self.attach(child, index);
        self.notify_change();
    }

    pub fn insert_child(&self, index: usize, child: &NodeRef) {
        self.attach(child, Some(index));
        self.notify_change();
    }

    /// Remove a direct child. Returns false when `child` is not a child of this node.
    pub fn remove_child(&self, child: &NodeRef) -> bool {
        if self.detach(child) {
            self.notify_change();
            true
        } else {
            false
        }
    }

    /// Structural insert without notification
    pub(crate) fn attach(&self, child: &NodeRef, index: Option<usize>) {
        if self.is_self_or_descendant_of(child) {
            warn!(kind = child.kind_name(), "Refusing to add a node below itself");
            return;
        }
        if let Some(old_parent) = child.parent() {
            old_parent.detach(child);
        }

        {
            let mut node = self.0.borrow_mut();
            let position = index
                .filter(|i| *i <= node.children.len())
                .unwrap_or(node.children.len());
            node.children.insert(position, child.clone());
        }
        {
            let mut c = child.0.borrow_mut();
            c.parent = Rc::downgrade(&self.0);
            c.child_index = None;
        }
        child.set_model(self.model().as_ref());
        self.sort_children();
    }

    /// Structural removal without notification
    pub(crate) fn detach(&self, child: &NodeRef) -> bool {
        let position = self.0.borrow().children.iter().position(|c| c == child);
        let Some(position) = position else {
            return false;
        };
        self.0.borrow_mut().children.remove(position);
        {
            let mut c = child.0.borrow_mut();
            c.parent = Weak::new();
            c.child_index = Some(position);
        }
        child.set_model(None);
        true
    }

    /// Detach every child matching `predicate`, without notification
    pub(crate) fn take_children(&self, predicate: impl Fn(&NodeRef) -> bool) -> Vec<NodeRef> {
        let taken: Vec<NodeRef> = self
            .children()
            .into_iter()
            .filter(|c| predicate(c))
            .collect();
        for child in &taken {
            self.detach(child);
        }
        taken
    }

    /// Apply the kind's child ordering
    pub fn sort_children(&self) {
        let parent_kind = self.kind_name();
        let mut node = self.0.borrow_mut();
        match parent_kind {
            kinds::TILE_GRID => node.children.sort_by(compare_layers),
            kinds::GAME_OBJECT | kinds::GAME_OBJECT_INSTANCE => {
                node.children.sort_by(compare_components)
            }
            _ => {}
        }
    }

    /// Release the subtree: children are detached recursively and the model link dropped
    pub fn dispose(&self) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in children {
            child.dispose();
        }
        let mut node = self.0.borrow_mut();
        node.parent = Weak::new();
        node.model = Weak::new();
    }
}

fn compare_layers(a: &NodeRef, b: &NodeRef) -> Ordering {
    let z = |n: &NodeRef| match &n.borrow().kind {
        NodeKind::TileLayer(layer) => layer.z,
        _ => 0.0,
    };
    z(a).partial_cmp(&z(b)).unwrap_or(Ordering::Equal)
}

/// Components first, ordered by id; other children keep their order
fn compare_components(a: &NodeRef, b: &NodeRef) -> Ordering {
    let key = |n: &NodeRef| {
        let node = n.borrow();
        if node.kind.is_component() {
            (0, node.kind.id().unwrap_or_default().to_string())
        } else {
            (1, String::new())
        }
    };
    key(a).cmp(&key(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(id: &str, z: f64) -> NodeRef {
        NodeRef::new(NodeKind::TileLayer(TileLayer {
            id: id.to_string(),
            z,
            ..TileLayer::default()
        }))
    }

    fn instance(id: &str) -> NodeRef {
        NodeRef::new(NodeKind::GameObjectInstance(GameObjectInstance {
            id: id.to_string(),
            ..Default::default()
        }))
    }

    fn assert_parent_invariant(root: &NodeRef) {
        for node in root.descendants() {
            if let Some(parent) = node.parent() {
                assert!(parent.children().contains(&node));
            }
            for child in node.children() {
                assert_eq!(child.parent().as_ref(), Some(&node));
            }
        }
    }

    #[test]
    fn test_add_remove_keeps_parent_invariant() {
        let root = NodeRef::new(NodeKind::Collection(Collection::default()));
        let a = instance("a");
        let b = instance("b");
        root.add_child(&a);
        root.add_child(&b);
        a.add_child(&b);
        assert_parent_invariant(&root);
        assert_eq!(root.child_count(), 1);
        assert_eq!(b.parent(), Some(a.clone()));

        assert!(a.remove_child(&b));
        assert!(b.parent().is_none());
        assert!(!a.remove_child(&b));
        assert_parent_invariant(&root);
    }

    #[test]
    fn test_removed_child_returns_to_its_index() {
        let root = NodeRef::new(NodeKind::Collection(Collection::default()));
        let ids = ["a", "b", "c"];
        let nodes: Vec<_> = ids.iter().map(|id| instance(id)).collect();
        for node in &nodes {
            root.add_child(node);
        }

        root.remove_child(&nodes[1]);
        assert_eq!(nodes[1].child_index(), Some(1));
        root.add_child(&nodes[1]);

        let order: Vec<_> = root.children().iter().filter_map(NodeRef::id).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_model_cascades_and_notifies_once() {
        let model = ModelCore::new();
        let root = NodeRef::new(NodeKind::Collection(Collection::default()));
        root.set_model(Some(&model));

        let a = instance("a");
        a.add_child(&instance("nested"));
        root.add_child(&a);

        for node in root.descendants() {
            assert!(Rc::ptr_eq(&node.model().unwrap(), &model));
        }
        assert_eq!(model.change_count(), 1);
        assert_eq!(model.take_changes(), vec![root.clone()]);

        root.remove_child(&a);
        assert!(a.model().is_none());
        assert!(a.children()[0].model().is_none());
        assert_eq!(model.change_count(), 2);
    }

    #[test]
    fn test_layers_sorted_by_z() {
        let grid = NodeRef::new(NodeKind::TileGrid(TileGrid::default()));
        grid.add_child(&layer("top", 0.5));
        grid.add_child(&layer("bottom", -0.5));
        grid.add_child(&layer("middle", 0.0));

        let order: Vec<_> = grid.children().iter().filter_map(NodeRef::id).collect();
        assert_eq!(order, vec!["bottom", "middle", "top"]);
    }

    #[test]
    fn test_components_sorted_by_id() {
        let go = NodeRef::new(NodeKind::GameObject(GameObject::default()));
        for id in ["script", "body", "light"] {
            go.add_child(&NodeRef::new(NodeKind::ComponentRef(ComponentRef {
                id: id.to_string(),
                ..Default::default()
            })));
        }
        let order: Vec<_> = go.children().iter().filter_map(NodeRef::id).collect();
        assert_eq!(order, vec!["body", "light", "script"]);
    }

    #[test]
    fn test_cannot_add_ancestor_as_child() {
        let root = NodeRef::new(NodeKind::Collection(Collection::default()));
        let a = instance("a");
        root.add_child(&a);
        a.add_child(&root);
        assert!(root.parent().is_none());
        assert_eq!(a.child_count(), 0);
    }

    #[test]
    fn test_flags_and_dispose() {
        let root = NodeRef::new(NodeKind::Collection(Collection::default()));
        let a = instance("a");
        let b = instance("b");
        root.add_child(&a);
        a.add_child(&b);

        a.set_flags_recursively(NodeFlags::LOCKED, true);
        assert!(a.has_flag(NodeFlags::LOCKED) && b.has_flag(NodeFlags::LOCKED));
        assert!(!root.has_flag(NodeFlags::LOCKED));
        assert!(a.has_flag(NodeFlags::TRANSFORMABLE));

        root.dispose();
        assert_eq!(root.child_count(), 0);
        assert!(a.parent().is_none());
        assert!(b.parent().is_none());
    }
}
