//! # Undo/Redo Stack
//!
//! Linear operation history with a cursor.
//!
//! ## Design
//!
//! - Operations are executed through the stack and recorded once they succeed
//! - Entries before the cursor can be undone, entries after it redone
//! - Recording a new operation discards everything after the cursor
//! - Batches group several operations into one [`CompositeOperation`]
//! - The oldest entry is evicted once `max_levels` is exceeded
//! - A save mark tracks the cursor position of the last save for dirty state
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! stack.execute(Box::new(RemoveChildOperation::new(parent, child)))?;
//! stack.undo()?;
//! stack.redo()?;
//! ```

use scened_properties::{CompositeOperation, Operation, OperationError};
use tracing::{debug, warn};

/// Notification sent to history listeners after the history changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Done { label: String },
    Undone { label: String },
    Redone { label: String },
}

impl HistoryEvent {
    pub fn label(&self) -> &str {
        match self {
            HistoryEvent::Done { label } | HistoryEvent::Undone { label } | HistoryEvent::Redone { label } => label,
        }
    }
}

/// Handle returned by [`UndoStack::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&HistoryEvent)>;

struct Batch {
    label: String,
    operations: Vec<Box<dyn Operation>>,
}

/// Undo/redo history for one document
pub struct UndoStack {
    entries: Vec<Box<dyn Operation>>,

    /// Number of entries currently applied
    cursor: usize,

    /// Maximum number of entries (0 = unlimited)
    max_levels: usize,

    /// Entries dropped from the front, so positions stay comparable
    evicted: usize,

    /// Absolute position of the last save; `None` once unreachable
    saved_at: Option<usize>,

    batch: Option<Batch>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_levels,
            evicted: 0,
            saved_at: Some(0),
            batch: None,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Execute `operation` and record it. Failed operations are not recorded.
    pub fn execute(&mut self, mut operation: Box<dyn Operation>) -> Result<(), OperationError> {
        if let Err(err) = operation.execute() {
            warn!(label = %operation.label(), error = %err, "Operation failed");
            return Err(err);
        }
        debug!(label = %operation.label(), "Executed operation");

        match &mut self.batch {
            Some(batch) => batch.operations.push(operation),
            None => self.record(operation),
        }
        Ok(())
    }

    /// Start collecting executed operations into one undo step
    pub fn begin_batch(&mut self, label: impl Into<String>) {
        if self.batch.is_some() {
            self.end_batch();
        }
        self.batch = Some(Batch {
            label: label.into(),
            operations: Vec::new(),
        });
    }

    /// Record the current batch. An empty batch records nothing.
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.batch.take() {
            if !batch.operations.is_empty() {
                self.record(Box::new(CompositeOperation::new(batch.label, batch.operations)));
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    fn record(&mut self, operation: Box<dyn Operation>) {
        let label = operation.label().to_string();

        self.entries.truncate(self.cursor);
        if self.saved_at.is_some_and(|saved| saved > self.position()) {
            self.saved_at = None;
        }
        self.entries.push(operation);
        self.cursor += 1;

        if self.max_levels > 0 && self.entries.len() > self.max_levels {
            self.entries.remove(0);
            self.cursor -= 1;
            self.evicted += 1;
        }

        self.notify(&HistoryEvent::Done { label });
    }

    /// Undo the most recent entry. Returns false when there is nothing to undo.
    /// A failing undo leaves the entry in place.
    pub fn undo(&mut self) -> Result<bool, OperationError> {
        self.end_batch();
        if self.cursor == 0 {
            return Ok(false);
        }

        let operation = &mut self.entries[self.cursor - 1];
        if let Err(err) = operation.undo() {
            warn!(label = %operation.label(), error = %err, "Undo failed");
            return Err(err);
        }
        let label = operation.label().to_string();
        self.cursor -= 1;
        debug!(label = %label, "Undone");

        self.notify(&HistoryEvent::Undone { label });
        Ok(true)
    }

    /// Redo the most recently undone entry. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, OperationError> {
        self.end_batch();
        if self.cursor == self.entries.len() {
            return Ok(false);
        }

        let operation = &mut self.entries[self.cursor];
        if let Err(err) = operation.redo() {
            warn!(label = %operation.label(), error = %err, "Redo failed");
            return Err(err);
        }
        let label = operation.label().to_string();
        self.cursor += 1;
        debug!(label = %label, "Redone");

        self.notify(&HistoryEvent::Redone { label });
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.cursor.checked_sub(1).map(|i| self.entries[i].label())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(|op| op.label())
    }

    /// Absolute cursor position, stable across evictions
    pub fn position(&self) -> usize {
        self.evicted + self.cursor
    }

    pub fn mark_saved(&mut self) {
        self.saved_at = Some(self.position());
    }

    /// Whether the cursor differs from the position recorded at the last save
    pub fn is_dirty(&self) -> bool {
        self.saved_at != Some(self.position())
    }

    /// Drop all history; the current state counts as saved
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.evicted = 0;
        self.saved_at = Some(0);
        self.batch = None;
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&HistoryEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, event: &HistoryEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_levels", &self.max_levels)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Adds `amount` to a shared counter
    struct Add {
        label: String,
        target: Rc<Cell<i32>>,
        amount: i32,
        fail_undo: bool,
    }

    fn add(target: &Rc<Cell<i32>>, amount: i32) -> Box<dyn Operation> {
        Box::new(Add {
            label: format!("Add {}", amount),
            target: target.clone(),
            amount,
            fail_undo: false,
        })
    }

    impl Operation for Add {
        fn label(&self) -> &str {
            &self.label
        }

        fn execute(&mut self) -> Result<(), OperationError> {
            self.target.set(self.target.get() + self.amount);
            Ok(())
        }

        fn undo(&mut self) -> Result<(), OperationError> {
            if self.fail_undo {
                return Err(OperationError::failed(&self.label, "refused"));
            }
            self.target.set(self.target.get() - self.amount);
            Ok(())
        }
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert!(!stack.is_dirty());
    }

    #[test]
    fn test_execute_undo_redo() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.execute(add(&value, 5)).unwrap();
        assert_eq!(value.get(), 5);
        assert_eq!(stack.undo_label(), Some("Add 5"));

        assert!(stack.undo().unwrap());
        assert_eq!(value.get(), 0);
        assert!(!stack.undo().unwrap());

        assert!(stack.redo().unwrap());
        assert_eq!(value.get(), 5);
        assert!(!stack.redo().unwrap());
    }

    #[test]
    fn test_new_operation_clears_redo() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();
        stack.execute(add(&value, 1)).unwrap();
        stack.undo().unwrap();
        assert_eq!(stack.redo_levels(), 1);

        stack.execute(add(&value, 2)).unwrap();
        assert_eq!(stack.redo_levels(), 0);
        assert_eq!(value.get(), 2);
    }

    #[test]
    fn test_batch_is_one_step() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.begin_batch("Move");
        stack.execute(add(&value, 1)).unwrap();
        stack.execute(add(&value, 2)).unwrap();
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_label(), Some("Move"));
        stack.undo().unwrap();
        assert_eq!(value.get(), 0);

        stack.begin_batch("Empty");
        stack.end_batch();
        assert_eq!(stack.undo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::with_max_levels(2);
        for i in 1..=3 {
            stack.execute(add(&value, i)).unwrap();
        }
        assert_eq!(stack.undo_levels(), 2);
        while stack.undo().unwrap() {}
        // the first edit was evicted
        assert_eq!(value.get(), 1);
        assert!(stack.is_dirty());
    }

    #[test]
    fn test_dirty_follows_save_mark() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();

        stack.execute(add(&value, 1)).unwrap();
        assert!(stack.is_dirty());
        stack.mark_saved();
        assert!(!stack.is_dirty());

        stack.undo().unwrap();
        assert!(stack.is_dirty());
        stack.redo().unwrap();
        assert!(!stack.is_dirty());

        // branching off before the mark makes it unreachable
        stack.undo().unwrap();
        stack.execute(add(&value, 7)).unwrap();
        assert!(stack.is_dirty());
        stack.undo().unwrap();
        assert!(stack.is_dirty());
    }

    #[test]
    fn test_failed_undo_keeps_entry() {
        let value = Rc::new(Cell::new(0));
        let mut stack = UndoStack::new();
        stack
            .execute(Box::new(Add {
                label: "Stuck".into(),
                target: value.clone(),
                amount: 3,
                fail_undo: true,
            }))
            .unwrap();

        assert!(stack.undo().is_err());
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(value.get(), 3);
    }

    #[test]
    fn test_listeners() {
        let value = Rc::new(Cell::new(0));
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut stack = UndoStack::new();

        let sink = events.clone();
        let id = stack.add_listener(move |event| sink.borrow_mut().push(event.clone()));

        stack.execute(add(&value, 1)).unwrap();
        stack.undo().unwrap();
        stack.redo().unwrap();
        assert_eq!(
            *events.borrow(),
            vec![
                HistoryEvent::Done { label: "Add 1".into() },
                HistoryEvent::Undone { label: "Add 1".into() },
                HistoryEvent::Redone { label: "Add 1".into() },
            ]
        );

        assert!(stack.remove_listener(id));
        stack.undo().unwrap();
        assert_eq!(events.borrow().len(), 3);
    }
}
