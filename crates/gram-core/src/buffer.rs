//! One open file.
//!
//! A [`Buffer`] starts *cold*: its contents are the raw lines read from
//! disk (or from a cache blob), with no view and no tags. The GUI thread
//! turns it *hot* by attaching a [`LiveView`], which owns the editable
//! text, the cursor and the applied tag spans. After that the view is the
//! single owner of the text.

use gram_buffer::{Cursor, Position, TextBuffer};
use gram_syntax::{TagSet, Tagger};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::key::BufferKey;

/// The editable side of a hot buffer.
pub struct LiveView {
    /// Text with linear undo
    pub text: TextBuffer,

    /// Insertion point and selection
    pub cursor: Cursor,

    /// Applied highlighting
    pub tags: TagSet,

    tagger: Arc<dyn Tagger>,
    links: Arc<dyn Tagger>,
}

impl LiveView {
    /// Builds a view over `contents`. Read-only views put the cursor at
    /// the end so appended log output stays in sight.
    pub fn new(
        contents: &str,
        tagger: Arc<dyn Tagger>,
        links: Arc<dyn Tagger>,
        read_only: bool,
    ) -> Self {
        let text = TextBuffer::from(contents);
        let head = if read_only { text.len_chars() } else { 0 };
        Self {
            text,
            cursor: Cursor::new(head),
            tags: TagSet::new(),
            tagger,
            links,
        }
    }

    /// Name of the language tagger in use.
    pub fn tagger_name(&self) -> &str {
        self.tagger.name()
    }

    /// Clears and re-applies tags on whole lines `lines` (clamped to the
    /// buffer). Returns the character range that was re-tagged.
    pub fn retag_lines(&mut self, lines: Range<usize>) -> Range<usize> {
        let last = self.text.len_lines();
        let first = lines.start.min(last);
        let end_line = lines.end.clamp(first, last);
        let start = self.text.line_to_char(first);
        let end = self.text.line_to_char(end_line);

        let mut fresh = match self.text.slice(start..end) {
            Ok(chunk) => {
                let mut spans = self.tagger.apply(&chunk);
                spans.merge(self.links.apply(&chunk));
                spans
            }
            Err(_) => return start..start,
        };
        fresh = fresh.offset(start);
        self.tags.retag(start..end, fresh);
        start..end
    }

    /// Re-tags the whole text.
    pub fn retag_all(&mut self) -> Range<usize> {
        self.retag_lines(0..self.text.len_lines())
    }

    /// Replaces the text with fresh disk contents. The cursor keeps its
    /// offset, or stays pinned to the end if it was there.
    pub fn reload(&mut self, contents: &str) {
        let at_end = self.cursor.head >= self.text.len_chars();
        self.text.reset(contents);
        self.tags.clear();
        let len = self.text.len_chars();
        if at_end {
            self.cursor.move_to(len);
        } else {
            self.cursor.clamp(len);
            self.cursor.clear_selection();
        }
    }

    /// Line and column of the cursor.
    pub fn cursor_position(&self) -> Position {
        self.text
            .char_idx_to_position(self.cursor.head)
            .unwrap_or(Position::ZERO)
    }

    /// Moves the cursor to a line and column, clamped to the text.
    pub fn goto(&mut self, position: Position) {
        let line = position.line.min(self.text.len_lines().saturating_sub(1));
        let range = self.text.line_range(line).unwrap_or(0..0);
        let head = (range.start + position.column).min(range.end);
        self.cursor.move_to(head);
    }
}

impl fmt::Debug for LiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView")
            .field("len_chars", &self.text.len_chars())
            .field("cursor", &self.cursor)
            .field("tagger", &self.tagger.name())
            .finish()
    }
}

/// An open file, cold or hot.
#[derive(Debug)]
pub struct Buffer {
    pub key: BufferKey,
    pub path: PathBuf,
    /// File name shown in the title
    pub name: String,
    /// Extension without the dot
    pub ext: String,
    /// Disk modification time at the last load or save
    pub mtime: Option<SystemTime>,
    pub read_only: bool,
    /// Unsaved local edits exist
    pub modified: bool,
    /// Disk changed while local edits were pending
    pub externally_modified: bool,
    /// Raw lines as last read or saved; what caches persist
    lines: Arc<Vec<String>>,
    view: Option<LiveView>,
}

impl Buffer {
    /// Creates a cold buffer.
    pub fn cold(path: &Path, lines: Vec<String>, mtime: Option<SystemTime>, read_only: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            key: BufferKey::new(path),
            path: path.to_path_buf(),
            name,
            ext,
            mtime,
            read_only,
            modified: false,
            externally_modified: false,
            lines: Arc::new(lines),
            view: None,
        }
    }

    pub fn is_hot(&self) -> bool {
        self.view.is_some()
    }

    pub fn view(&self) -> Option<&LiveView> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut LiveView> {
        self.view.as_mut()
    }

    /// Attaches a live view built from the cold lines. Does nothing if
    /// the buffer is already hot.
    pub(crate) fn attach(&mut self, tagger: Arc<dyn Tagger>, links: Arc<dyn Tagger>) -> &mut LiveView {
        let contents = self.lines.concat();
        let read_only = self.read_only;
        self.view
            .get_or_insert_with(|| LiveView::new(&contents, tagger, links, read_only))
    }

    /// Raw lines as last loaded or saved.
    pub fn lines(&self) -> Arc<Vec<String>> {
        self.lines.clone()
    }

    pub(crate) fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = Arc::new(lines);
    }

    /// Window title for this buffer.
    pub fn title(&self) -> String {
        let mut title = self.name.clone();
        if self.modified {
            title.push('*');
        }
        if self.read_only {
            title.push_str("  (read only)");
        }
        if self.externally_modified {
            title = format!(
                "!! WARNING !!    External edits to  ' {} '  close and reopen    !! WARNING !!",
                title
            );
        }
        title
    }
}

/// Splits text into lines that keep their line breaks, so joining them
/// gives back the original text.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}
