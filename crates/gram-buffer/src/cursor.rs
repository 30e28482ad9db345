//! Cursor and position types for text navigation.
//!
//! `Position` is a line/column pair used at the edges (link targets,
//! search results). Inside a live buffer the cursor works in character
//! offsets, which is what the rope indexes by.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A position in the text buffer (line and column).
///
/// Both line and column are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters not bytes)
    pub column: usize,
}

impl Position {
    /// Creates a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position at the start of the document.
    pub const ZERO: Position = Position { line: 0, column: 0 };
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Equal => self.column.cmp(&other.column),
            other => other,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display as 1-indexed for user-facing output
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// The insertion cursor with an optional selection anchor.
///
/// When `anchor` is set, the text between `anchor` and `head` is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Character offset of the insertion point
    pub head: usize,
    /// Fixed end of the selection, if any
    pub anchor: Option<usize>,
}

impl Cursor {
    /// Creates a cursor at a character offset.
    pub fn new(head: usize) -> Self {
        Self { head, anchor: None }
    }

    /// Moves the cursor, dropping any selection.
    pub fn move_to(&mut self, head: usize) {
        self.head = head;
        self.anchor = None;
    }

    /// Moves the head while keeping (or starting) the selection.
    pub fn select_to(&mut self, head: usize) {
        if self.anchor.is_none() {
            self.anchor = Some(self.head);
        }
        self.head = head;
        if self.anchor == Some(head) {
            self.anchor = None;
        }
    }

    /// Selects `range`, leaving the head at its end.
    pub fn select(&mut self, range: Range<usize>) {
        self.anchor = Some(range.start);
        self.head = range.end;
    }

    /// Selects everything, head at the start.
    pub fn select_all(&mut self, len: usize) {
        self.head = 0;
        self.anchor = Some(len);
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// Returns true if text is selected.
    pub fn has_selection(&self) -> bool {
        self.anchor.is_some_and(|a| a != self.head)
    }

    /// Returns the selected range, ordered.
    pub fn selection_range(&self) -> Option<Range<usize>> {
        let anchor = self.anchor?;
        if anchor == self.head {
            return None;
        }
        Some(anchor.min(self.head)..anchor.max(self.head))
    }

    /// Keeps both ends within a buffer of `len` characters.
    pub fn clamp(&mut self, len: usize) {
        self.head = self.head.min(len);
        self.anchor = self.anchor.map(|a| a.min(len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(0, 5) < Position::new(1, 0));
        assert!(Position::new(1, 2) < Position::new(1, 3));
        assert_eq!(Position::new(2, 0).to_string(), "3:1");
    }

    #[test]
    fn test_select_to_keeps_anchor() {
        let mut cursor = Cursor::new(4);
        cursor.select_to(8);
        cursor.select_to(2);
        assert_eq!(cursor.selection_range(), Some(2..4));
    }

    #[test]
    fn test_select_back_to_anchor_clears_selection() {
        let mut cursor = Cursor::new(4);
        cursor.select_to(6);
        cursor.select_to(4);
        assert!(!cursor.has_selection());
        assert_eq!(cursor.anchor, None);
    }

    #[test]
    fn test_clamp() {
        let mut cursor = Cursor::new(10);
        cursor.select_all(20);
        cursor.head = 30;
        cursor.clamp(12);
        assert_eq!(cursor.head, 12);
        assert_eq!(cursor.anchor, Some(12));
    }
}
