//! Core text buffer implementation using a rope.
//!
//! Ropes give O(log n) edits anywhere in large files, and a clone shares
//! the underlying chunks, so a background reader can hold a snapshot
//! while the owner keeps editing.

use ropey::Rope;
use std::borrow::Cow;
use std::ops::Range;

use crate::history::{Edit, EditKind, History};
use crate::search;
use crate::{BufferError, BufferResult, Position};

/// Maximum undo groups kept per buffer.
const HISTORY_LIMIT: usize = 1000;

/// A text buffer backed by a rope, with linear undo.
///
/// `TextBuffer` is `Send` but owned by one thread at a time; share text
/// with other threads through [`TextBuffer::snapshot`].
#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
    history: History,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use gram_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            history: History::new(HISTORY_LIMIT),
        }
    }

    // ==================== Text Access ====================

    /// Returns the entire text content.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        self.rope.slice(..).into()
    }

    /// Returns a cheap, immutable copy of the text.
    pub fn snapshot(&self) -> Rope {
        self.rope.clone()
    }

    /// Returns a specific line (0-indexed), including its line break.
    pub fn line(&self, line_idx: usize) -> BufferResult<Cow<'_, str>> {
        if line_idx >= self.len_lines() {
            return Err(BufferError::PositionOutOfBounds {
                line: line_idx,
                column: 0,
            });
        }
        Ok(self.rope.line(line_idx).into())
    }

    /// Returns a line without its trailing line break.
    pub fn line_content(&self, line_idx: usize) -> BufferResult<String> {
        let line = self.line(line_idx)?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Returns a slice of text by character range.
    pub fn slice(&self, range: Range<usize>) -> BufferResult<Cow<'_, str>> {
        if range.start > range.end || range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }
        Ok(self.rope.slice(range).into())
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the number of lines in the buffer.
    ///
    /// An empty buffer has 1 line. A buffer ending with `\n` counts
    /// the empty line after it.
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Character offset of the start of a line.
    pub fn line_to_char(&self, line_idx: usize) -> usize {
        self.rope.line_to_char(line_idx.min(self.len_lines()))
    }

    /// Line containing a character offset.
    pub fn char_to_line(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.len_chars()))
    }

    /// Character range of a line, excluding its line break.
    pub fn line_range(&self, line_idx: usize) -> BufferResult<Range<usize>> {
        let start = self.line_to_char(line_idx);
        let len = self.line_content(line_idx)?.chars().count();
        Ok(start..start + len)
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<()> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }
        if text.is_empty() {
            return Ok(());
        }

        self.history.push(Edit::insert(char_idx, text));
        self.rope.insert(char_idx, text);
        Ok(())
    }

    /// Deletes text in a character range, returning it.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        if range.start > range.end || range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }
        if range.is_empty() {
            return Ok(String::new());
        }

        let deleted: String = self.rope.slice(range.clone()).into();
        self.history.push(Edit::delete(range.start, deleted.clone()));
        self.rope.remove(range);
        Ok(deleted)
    }

    /// Replaces text in a range as a single undo step.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        self.history.begin_group();
        let result = self
            .delete(range.clone())
            .and_then(|deleted| self.insert(range.start, text).map(|_| deleted));
        self.history.end_group();
        result
    }

    /// Replaces the whole content without recording history; the new text
    /// becomes the save point.
    pub fn reset(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.history.clear();
    }

    // ==================== Undo/Redo ====================

    /// Undoes the last edit group.
    pub fn undo(&mut self) -> BufferResult<()> {
        let edits = self.history.undo().ok_or(BufferError::NothingToUndo)?;

        for edit in edits.iter().rev() {
            match edit.kind {
                EditKind::Insert => {
                    let end = edit.position + edit.content.chars().count();
                    self.rope.remove(edit.position..end);
                }
                EditKind::Delete => self.rope.insert(edit.position, &edit.content),
            }
        }
        Ok(())
    }

    /// Redoes the last undone edit group.
    pub fn redo(&mut self) -> BufferResult<()> {
        let edits = self.history.redo().ok_or(BufferError::NothingToRedo)?;

        for edit in &edits {
            match edit.kind {
                EditKind::Insert => self.rope.insert(edit.position, &edit.content),
                EditKind::Delete => {
                    let end = edit.position + edit.content.chars().count();
                    self.rope.remove(edit.position..end);
                }
            }
        }
        Ok(())
    }

    // ==================== Save point ====================

    /// Returns true if there are changes since the last save point.
    pub fn is_modified(&self) -> bool {
        self.history.is_dirty()
    }

    /// Marks the current text as saved.
    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    // ==================== Position Conversion ====================

    /// Converts a Position (line, column) to a character index.
    pub fn position_to_char_idx(&self, pos: Position) -> BufferResult<usize> {
        if pos.line >= self.len_lines() {
            return Err(BufferError::PositionOutOfBounds {
                line: pos.line,
                column: pos.column,
            });
        }

        let line_start = self.rope.line_to_char(pos.line);
        let line_len = self.rope.line(pos.line).len_chars();
        if pos.column > line_len {
            return Err(BufferError::PositionOutOfBounds {
                line: pos.line,
                column: pos.column,
            });
        }

        Ok(line_start + pos.column)
    }

    /// Converts a character index to a Position (line, column).
    pub fn char_idx_to_position(&self, char_idx: usize) -> BufferResult<Position> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }

        let line = self.rope.char_to_line(char_idx);
        let column = char_idx - self.rope.line_to_char(line);
        Ok(Position { line, column })
    }

    // ==================== Search ====================

    /// Finds `pattern` case-insensitively, starting at or after `from`.
    pub fn find_next(&self, pattern: &str, from: usize) -> Option<usize> {
        let haystack: Vec<char> = self.rope.chars().collect();
        let needle: Vec<char> = pattern.chars().collect();
        search::find_forward(&haystack, &needle, from)
    }

    /// Finds `pattern` case-insensitively, starting at or before `from`.
    pub fn find_prev(&self, pattern: &str, from: usize) -> Option<usize> {
        let haystack: Vec<char> = self.rope.chars().collect();
        let needle: Vec<char> = pattern.chars().collect();
        search::find_backward(&haystack, &needle, from)
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            history: History::new(HISTORY_LIMIT),
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
