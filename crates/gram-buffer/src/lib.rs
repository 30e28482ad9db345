//! # Gram Buffer
//!
//! Text storage for live (hot) buffers.
//!
//! ## Key Concepts
//!
//! - `TextBuffer` owns a rope; cloning a rope is cheap, which lets
//!   background searches take a snapshot without copying text.
//! - `History` is a linear undo log with a save point, so "are there
//!   outstanding changes?" is answered by the history itself.
//! - `breaks` implements word/symbol-run boundary scanning used for
//!   word-wise movement and deletion.

pub mod breaks;
mod buffer;
mod cursor;
mod history;
pub mod search;

pub use breaks::{Direction, find_boundary};
pub use buffer::TextBuffer;
pub use cursor::{Cursor, Position};
pub use history::{Edit, EditKind, History};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Position {line}:{column} is out of bounds")]
    PositionOutOfBounds { line: usize, column: usize },

    #[error("Invalid character index: {0}")]
    InvalidCharIndex(usize),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let buffer = TextBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len_chars(), 0);
        assert!(!buffer.is_modified());
    }

    #[test]
    fn test_insert_and_delete() {
        let mut buffer = TextBuffer::new();
        buffer.insert(0, "Hello").unwrap();
        buffer.insert(5, ", World!").unwrap();
        assert_eq!(buffer.text(), "Hello, World!");

        buffer.delete(5..7).unwrap();
        assert_eq!(buffer.text(), "HelloWorld!");
    }

    #[test]
    fn test_undo_back_to_save_point_is_clean() {
        let mut buffer = TextBuffer::from("abc");
        buffer.insert(3, "\n").unwrap();
        assert!(buffer.is_modified());

        buffer.undo().unwrap();
        assert_eq!(buffer.text(), "abc");
        assert!(!buffer.is_modified());

        buffer.redo().unwrap();
        assert!(buffer.is_modified());
    }

    #[test]
    fn test_line_operations() {
        let buffer = TextBuffer::from("Line 1\nLine 2\nLine 3");
        assert_eq!(buffer.len_lines(), 3);
        assert_eq!(buffer.line(0).unwrap(), "Line 1\n");
        assert_eq!(buffer.line(2).unwrap(), "Line 3");
    }
}
