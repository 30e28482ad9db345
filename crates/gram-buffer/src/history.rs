//! Linear undo/redo history.
//!
//! Edits are recorded as groups. Rapid adjacent keystrokes coalesce into
//! the previous group. Every group carries a unique id; the id of the
//! group on top of the undo stack identifies the current text state, which
//! is what the save point remembers.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The type of edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    /// Text was inserted
    Insert,
    /// Text was deleted
    Delete,
}

/// A single edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    /// What kind of edit this is
    pub kind: EditKind,
    /// Character position where the edit occurred
    pub position: usize,
    /// The text that was inserted or deleted
    pub content: String,
}

impl Edit {
    /// Creates an insert edit.
    pub fn insert(position: usize, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Insert,
            position,
            content: content.into(),
        }
    }

    /// Creates a delete edit.
    pub fn delete(position: usize, content: impl Into<String>) -> Self {
        Self {
            kind: EditKind::Delete,
            position,
            content: content.into(),
        }
    }

    /// Returns true if this edit can be coalesced with another.
    ///
    /// Edits coalesce when they are the same kind, adjacent, and neither
    /// contains a newline.
    pub fn can_coalesce(&self, other: &Edit) -> bool {
        if self.kind != other.kind {
            return false;
        }

        if self.content.contains('\n') || other.content.contains('\n') {
            return false;
        }

        match self.kind {
            EditKind::Insert => self.position + self.content.chars().count() == other.position,
            EditKind::Delete => {
                other.position + other.content.chars().count() == self.position
                    || self.position == other.position
            }
        }
    }

    /// Coalesces another edit into this one.
    pub fn coalesce(&mut self, other: Edit) {
        match self.kind {
            EditKind::Insert => self.content.push_str(&other.content),
            EditKind::Delete => {
                if other.position < self.position {
                    self.content = other.content + &self.content;
                    self.position = other.position;
                } else {
                    self.content.push_str(&other.content);
                }
            }
        }
    }
}

/// A group of edits that are undone/redone together.
#[derive(Debug, Clone)]
struct EditGroup {
    id: u64,
    edits: Vec<Edit>,
    timestamp: Option<Instant>,
}

/// Manages undo/redo history and the save point.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<EditGroup>,
    redo_stack: Vec<EditGroup>,
    max_size: usize,
    coalesce_threshold: Duration,
    in_group: bool,
    /// Set by `begin_group` until the group's first edit arrives.
    group_pending: bool,
    next_id: u64,
    /// State id at the last save; 0 is the empty history.
    saved: u64,
}

impl History {
    /// Creates a new history with the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_size.min(64)),
            redo_stack: Vec::new(),
            max_size,
            coalesce_threshold: Duration::from_millis(300),
            in_group: false,
            group_pending: false,
            next_id: 1,
            saved: 0,
        }
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Pushes an edit, clearing the redo stack.
    pub fn push(&mut self, edit: Edit) {
        self.redo_stack.clear();
        let id = self.fresh_id();

        if let Some(last_group) = self.undo_stack.back_mut()
            && !self.group_pending
        {
            let recent = last_group
                .timestamp
                .is_some_and(|t| t.elapsed() < self.coalesce_threshold);

            if recent
                && let Some(last_edit) = last_group.edits.last_mut()
                && last_edit.can_coalesce(&edit)
            {
                last_edit.coalesce(edit);
                last_group.timestamp = Some(Instant::now());
                last_group.id = id;
                return;
            }

            if self.in_group {
                last_group.edits.push(edit);
                last_group.timestamp = Some(Instant::now());
                last_group.id = id;
                return;
            }
        }

        self.group_pending = false;
        self.undo_stack.push_back(EditGroup {
            id,
            edits: vec![edit],
            timestamp: Some(Instant::now()),
        });

        while self.undo_stack.len() > self.max_size {
            self.undo_stack.pop_front();
        }
    }

    /// Starts an edit group; edits until `end_group()` undo as one step.
    pub fn begin_group(&mut self) {
        self.in_group = true;
        self.group_pending = true;
    }

    /// Ends the current edit group.
    pub fn end_group(&mut self) {
        self.in_group = false;
        self.group_pending = false;
    }

    /// Pops the last group. The edits are returned in application order;
    /// the caller reverses them back to front.
    pub fn undo(&mut self) -> Option<Vec<Edit>> {
        let group = self.undo_stack.pop_back()?;
        let edits = group.edits.clone();
        self.redo_stack.push(EditGroup {
            timestamp: None,
            ..group
        });
        Some(edits)
    }

    /// Re-applies the last undone group.
    pub fn redo(&mut self) -> Option<Vec<Edit>> {
        let group = self.redo_stack.pop()?;
        let edits = group.edits.clone();
        self.undo_stack.push_back(group);
        Some(edits)
    }

    /// Identifier of the current text state.
    pub fn state(&self) -> u64 {
        self.undo_stack.back().map_or(0, |g| g.id)
    }

    /// Records the current state as the saved one.
    pub fn mark_saved(&mut self) {
        self.saved = self.state();
    }

    /// Returns true if the text differs from the last save point.
    pub fn is_dirty(&self) -> bool {
        self.state() != self.saved
    }

    /// Clears all history; the empty state becomes the save point.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.saved = 0;
    }
}
