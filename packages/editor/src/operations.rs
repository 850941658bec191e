//! Structural operations on the node tree

use crate::node::{NodeRef, Overrides};
use scened_properties::{Operation, OperationError};
use tracing::debug;

/// Adds a child; undo removes it again
pub struct AddChildOperation {
    label: String,
    parent: NodeRef,
    child: NodeRef,
    index: Option<usize>,
}

impl AddChildOperation {
    pub fn new(parent: NodeRef, child: NodeRef) -> Self {
        Self {
            label: format!("Add {}", child.kind_name()),
            parent,
            child,
            index: None,
        }
    }

    /// Insert at a position instead of appending
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn child(&self) -> &NodeRef {
        &self.child
    }
}

impl Operation for AddChildOperation {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        debug!(parent = self.parent.kind_name(), child = self.child.kind_name(), "Adding child");
        match self.index {
            Some(index) => self.parent.insert_child(index, &self.child),
            None => self.parent.add_child(&self.child),
        }
        if self.child.parent().as_ref() != Some(&self.parent) {
            return Err(OperationError::failed(&self.label, "the node cannot be added here"));
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        if !self.parent.remove_child(&self.child) {
            return Err(OperationError::failed(&self.label, "the node is no longer a child"));
        }
        Ok(())
    }

    fn redo(&mut self) -> Result<(), OperationError> {
        // Back to the position it was removed from
        self.parent.add_child(&self.child);
        Ok(())
    }
}

/// Removes a child; undo puts it back at its former position
pub struct RemoveChildOperation {
    label: String,
    parent: NodeRef,
    child: NodeRef,
}

impl RemoveChildOperation {
    pub fn new(parent: NodeRef, child: NodeRef) -> Self {
        Self {
            label: format!("Remove {}", child.kind_name()),
            parent,
            child,
        }
    }
}

impl Operation for RemoveChildOperation {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        debug!(parent = self.parent.kind_name(), child = self.child.kind_name(), "Removing child");
        if !self.parent.remove_child(&self.child) {
            return Err(OperationError::failed(&self.label, "the node is not a child"));
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        self.parent.add_child(&self.child);
        Ok(())
    }
}

/// Edit of a reference node's own properties.
///
/// Pointing a reference at another document reloads it, which drops the
/// overrides of components the new document lacks. Undo puts the override
/// table back as it was before the edit.
pub struct ReferenceEditOperation {
    node: NodeRef,
    inner: Box<dyn Operation>,
    before: Option<Overrides>,
}

impl ReferenceEditOperation {
    pub fn new(node: NodeRef, inner: Box<dyn Operation>) -> Self {
        Self {
            node,
            inner,
            before: None,
        }
    }

    fn restore_overrides(&self) {
        let Some(before) = &self.before else {
            return;
        };
        if let Some(overrides) = self.node.borrow_mut().kind_mut().overrides_mut() {
            overrides.clone_from(before);
        }
        self.node.notify_change();
    }
}

impl Operation for ReferenceEditOperation {
    fn label(&self) -> &str {
        self.inner.label()
    }

    fn execute(&mut self) -> Result<(), OperationError> {
        self.before = self.node.borrow().kind().overrides().cloned();
        self.inner.execute()
    }

    fn undo(&mut self) -> Result<(), OperationError> {
        self.inner.undo()?;
        debug!(kind = self.node.kind_name(), "Restoring reference overrides");
        self.restore_overrides();
        Ok(())
    }

    fn redo(&mut self) -> Result<(), OperationError> {
        self.inner.redo()
    }
}
