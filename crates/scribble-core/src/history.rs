//! Linear undo/redo history over element-collection snapshots.
//!
//! History holds complete copies of the element collection and an index into
//! them. `snapshots[index]` is the collection currently on screen, except
//! while a drawing gesture has not been committed yet. Recording after an
//! undo drops every redo state: there is no branching.
//!
//! Only local commits are recorded. Remote replacements bypass history, so a
//! local undo returns to the last local commit rather than reverting someone
//! else's edit.

use crate::element::Element;

/// A full copy of the element collection.
pub type Snapshot = Vec<Element>;

/// Snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
    /// Maximum number of snapshots kept (None = unbounded).
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a history whose only entry is the empty collection.
    pub fn new() -> Self {
        Self::with_initial(Vec::new())
    }

    /// Create a history starting at `initial`.
    pub fn with_initial(initial: Snapshot) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            limit: None,
        }
    }

    /// Keep at most `limit` snapshots, dropping the oldest first.
    /// A limit below 1 is treated as 1.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self.enforce_limit();
        self
    }

    /// Record a new snapshot after the current one, discarding redo states.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;
        self.enforce_limit();
    }

    /// Step back one snapshot. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.snapshots[self.index])
    }

    /// Step forward one snapshot. Returns `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        Some(&self.snapshots[self.index])
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: a history has at least one snapshot.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Forget everything and start over at `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        self.snapshots = vec![initial];
        self.index = 0;
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else { return };
        if self.snapshots.len() > limit {
            let excess = self.snapshots.len() - limit;
            self.snapshots.drain(..excess);
            self.index = self.index.saturating_sub(excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BoxSize, ElementKind, ElementStyle};
    use kurbo::Point;

    fn rect(x: f64) -> Element {
        Element::new(
            Point::new(x, 0.0),
            ElementKind::Rectangle { size: BoxSize::new(10.0, 10.0) },
            ElementStyle::default(),
        )
    }

    /// Simulates `n` local commits, each appending one element.
    fn committed(n: usize) -> (History, Vec<Snapshot>) {
        let mut history = History::new();
        let mut states = vec![Vec::new()];
        let mut current = Vec::new();
        for i in 0..n {
            current.push(rect(i as f64));
            history.record(current.clone());
            states.push(current.clone());
        }
        (history, states)
    }

    #[test]
    fn test_new_history_has_nothing_to_undo() {
        let mut history = History::new();
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.len(), 1);
        assert!(history.current().is_empty());
    }

    #[test]
    fn test_undo_n_times_returns_to_empty() {
        let (mut history, states) = committed(5);
        for i in (0..5).rev() {
            assert_eq!(history.undo(), Some(&states[i]));
        }
        assert!(history.current().is_empty());
        assert!(history.undo().is_none());
        assert_eq!(history.index(), 0);
    }

    #[test]
    fn test_redo_restores_pre_undo_state() {
        let (mut history, states) = committed(3);
        history.undo();
        assert_eq!(history.redo(), Some(&states[3]));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_record_after_undo_discards_redo_branch() {
        let mut history = History::new();
        let a = vec![rect(1.0)];
        let b = vec![rect(1.0), rect(2.0)];
        let c = vec![rect(1.0), rect(3.0)];
        history.record(a.clone());
        history.record(b);
        assert_eq!(history.undo(), Some(&a));
        history.record(c.clone());
        assert!(history.redo().is_none());
        assert_eq!(history.current(), &c);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_index_invariant_holds() {
        let (mut history, _) = committed(4);
        for _ in 0..10 {
            history.undo();
            assert!(history.index() < history.len());
        }
        for _ in 0..10 {
            history.redo();
            assert!(history.index() < history.len());
        }
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new().with_limit(3);
        for i in 0..5 {
            history.record(vec![rect(f64::from(i))]);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), 2);
        history.undo();
        history.undo();
        assert!(history.undo().is_none());
    }
}
