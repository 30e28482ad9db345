//! Word and symbol-run boundary scanning.
//!
//! A boundary is one of a fixed set of punctuation characters or
//! whitespace. Scanning from a cursor either runs to the next boundary
//! character or, when the cursor already touches one, across the whole
//! run of that same character, so `foo)))bar` moves over `)))` in a single
//! step. Movement and deletion share this search; only the direction in
//! which the resulting range is applied differs.

use std::ops::Range;

/// Characters that end a word.
pub const BREAK_CHARS: &[char] = &[
    '{', '}', '(', ')', '[', ']', '.', ',', ':', ';', '/', '\\', '"', '\'', '+', '-', '*', '=',
    ' ', '\t',
];

/// Scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Returns true if `c` is a boundary character.
pub fn is_break(c: char) -> bool {
    BREAK_CHARS.contains(&c)
}

/// Signed character distance from `cursor` to the next boundary in `line`.
///
/// Returns 0 only when the cursor already sits at the scanned end of the
/// line; otherwise the result moves at least one character. With no
/// boundary ahead the result reaches the end (or start) of the line.
pub fn find_boundary(line: &str, cursor: usize, direction: Direction) -> isize {
    let chars: Vec<char> = line.chars().collect();
    let cursor = cursor.min(chars.len());

    match direction {
        Direction::Forward => {
            let ahead = &chars[cursor..];
            let Some(&first) = ahead.first() else {
                return 0;
            };
            let distance = if is_break(first) {
                ahead.iter().take_while(|&&c| c == first).count()
            } else {
                ahead.iter().position(|&c| is_break(c)).unwrap_or(ahead.len())
            };
            distance as isize
        }
        Direction::Backward => {
            let behind = &chars[..cursor];
            let Some(&last) = behind.last() else {
                return 0;
            };
            let distance = if is_break(last) {
                behind.iter().rev().take_while(|&&c| c == last).count()
            } else {
                behind
                    .iter()
                    .rev()
                    .position(|&c| is_break(c))
                    .unwrap_or(behind.len())
            };
            -(distance as isize)
        }
    }
}

/// The character range covered by one boundary step from `cursor`.
pub fn boundary_range(line: &str, cursor: usize, direction: Direction) -> Range<usize> {
    let delta = find_boundary(line, cursor, direction);
    let cursor = cursor.min(line.chars().count());
    let target = cursor.saturating_add_signed(delta);
    cursor.min(target)..cursor.max(target)
}
