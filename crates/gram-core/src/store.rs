//! The ordered map of open buffers.
//!
//! Iteration order is most-recently-used first: every lookup or insert
//! moves the touched entry to the front. One lock guards the map; it is
//! taken for each mutation and released before any disk I/O.
//!
//! Buffers created off the GUI thread stay cold. The GUI thread promotes
//! them with [`BufferStore::promote`] when they are first shown.

use gram_syntax::LanguageRegistry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use ropey::Rope;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::SystemTime;
use tracing::debug;

use crate::buffer::{Buffer, split_lines};
use crate::cache::CachedFile;
use crate::key::BufferKey;
use crate::{CoreError, CoreResult};

/// Text handed to search workers.
#[derive(Debug, Clone)]
pub enum Contents {
    /// A cold buffer's raw lines
    Lines(Arc<Vec<String>>),
    /// Snapshot of a hot buffer's text
    Live(Rope),
}

impl Contents {
    /// Calls `f` with each 0-based line index and the line text, line
    /// break removed.
    pub fn for_each_line(&self, mut f: impl FnMut(usize, &str)) {
        match self {
            Contents::Lines(lines) => {
                for (idx, line) in lines.iter().enumerate() {
                    f(idx, line.trim_end_matches(['\n', '\r']));
                }
            }
            Contents::Live(rope) => {
                for (idx, line) in rope.lines().enumerate() {
                    let line = line.to_string();
                    f(idx, line.trim_end_matches(['\n', '\r']));
                }
            }
        }
    }
}

pub struct BufferStore {
    entries: Mutex<IndexMap<BufferKey, Buffer>>,
    gui_thread: ThreadId,
    syntax: Arc<LanguageRegistry>,
}

impl BufferStore {
    /// Creates a store whose GUI thread is the calling thread.
    pub fn new(syntax: Arc<LanguageRegistry>) -> Self {
        Self::with_gui_thread(syntax, std::thread::current().id())
    }

    pub fn with_gui_thread(syntax: Arc<LanguageRegistry>, gui_thread: ThreadId) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            gui_thread,
            syntax,
        }
    }

    pub fn is_gui_thread(&self) -> bool {
        std::thread::current().id() == self.gui_thread
    }

    // ==================== Lookup ====================

    /// Returns the key of the buffer for `path`, creating it if needed,
    /// and moves it to the front.
    ///
    /// A new buffer takes its lines from `cached` when the file's mtime
    /// still matches the cached one, and from disk otherwise. A missing
    /// file gives an empty buffer. New buffers are hot when created on the
    /// GUI thread and cold elsewhere.
    pub fn get(
        &self,
        path: &Path,
        read_only: bool,
        cached: Option<CachedFile>,
    ) -> CoreResult<BufferKey> {
        let key = BufferKey::new(path);
        if self.touch(&key) {
            if self.is_gui_thread() {
                self.promote(&key)?;
            }
            return Ok(key);
        }

        if path.is_dir() {
            return Err(CoreError::NotAFile(path.to_path_buf()));
        }

        let (mut lines, mut mtime) = match cached {
            Some(cached) => (cached.lines, cached.mtime),
            None => (Vec::new(), None),
        };
        if path.is_file() {
            let disk_mtime = std::fs::metadata(path)
                .and_then(|m| m.modified())
                .map_err(|e| CoreError::file(path, e))?;
            if mtime != Some(disk_mtime) {
                let text =
                    std::fs::read_to_string(path).map_err(|e| CoreError::file(path, e))?;
                lines = split_lines(&text);
                mtime = Some(disk_mtime);
            } else {
                debug!("Using cached lines for file://{}", path.display());
            }
        }

        let buffer = Buffer::cold(path, lines, mtime, read_only);
        let mut entries = self.entries.lock();
        // Another thread may have loaded it while the lock was released.
        if let Some(idx) = entries.get_index_of(&key) {
            entries.move_index(idx, 0);
        } else {
            entries.shift_insert(0, key.clone(), buffer);
        }
        drop(entries);

        if self.is_gui_thread() {
            self.promote(&key)?;
        }
        Ok(key)
    }

    /// Moves `key` to the front. Returns false if it is not open.
    pub fn touch(&self, key: &BufferKey) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_index_of(key) {
            Some(idx) => {
                entries.move_index(idx, 0);
                true
            }
            None => false,
        }
    }

    /// Makes a buffer hot. Only valid on the GUI thread; promoting a hot
    /// buffer does nothing.
    pub fn promote(&self, key: &BufferKey) -> CoreResult<()> {
        if !self.is_gui_thread() {
            return Err(CoreError::NotGuiThread);
        }
        let mut entries = self.entries.lock();
        let buffer = entries
            .get_mut(key)
            .ok_or_else(|| CoreError::BufferNotFound(key.clone()))?;
        if !buffer.is_hot() {
            let tagger = self.syntax.tagger_for(&buffer.ext);
            buffer.attach(tagger, self.syntax.links());
        }
        Ok(())
    }

    pub fn contains(&self, key: &BufferKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Runs `f` on a buffer without changing the order.
    pub fn with<R>(&self, key: &BufferKey, f: impl FnOnce(&Buffer) -> R) -> Option<R> {
        self.entries.lock().get(key).map(f)
    }

    /// Runs `f` on a buffer for mutation without changing the order.
    pub fn with_mut<R>(&self, key: &BufferKey, f: impl FnOnce(&mut Buffer) -> R) -> Option<R> {
        self.entries.lock().get_mut(key).map(f)
    }

    // ==================== Removal ====================

    /// Removes a buffer, dropping its view. Returns the removed buffer.
    pub fn close(&self, key: &BufferKey) -> Option<Buffer> {
        self.entries.lock().shift_remove(key)
    }

    /// Removes every buffer for which `keep` returns false.
    pub fn retain(&self, mut keep: impl FnMut(&BufferKey, &Buffer) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, buffer| keep(key, buffer));
        before - entries.len()
    }

    // ==================== Saving ====================

    /// Writes `text` to `path`, creating parent directories. On success
    /// the stored mtime and lines of an open buffer for `path` follow the
    /// file, so the watcher does not see the save as an external edit.
    pub fn save(&self, path: &Path, text: &str) -> CoreResult<Option<SystemTime>> {
        if path.is_dir() {
            return Err(CoreError::NotAFile(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::file(parent, e))?;
        }
        std::fs::write(path, text).map_err(|e| CoreError::file(path, e))?;
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();

        let key = BufferKey::new(path);
        self.with_mut(&key, |buffer| {
            buffer.set_lines(split_lines(text));
            buffer.mtime = mtime;
            buffer.modified = false;
            buffer.externally_modified = false;
            if let Some(view) = buffer.view_mut() {
                view.text.mark_saved();
            }
        });
        Ok(mtime)
    }

    // ==================== Snapshots ====================

    /// Keys front to back.
    pub fn keys(&self) -> Vec<BufferKey> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Paths front to back.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.lock().values().map(|b| b.path.clone()).collect()
    }

    /// Most recently used buffer.
    pub fn front(&self) -> Option<BufferKey> {
        self.entries.lock().keys().next().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Text of every buffer for searching, skipping `exclude`.
    pub fn contents(&self, exclude: &BufferKey) -> Vec<(PathBuf, Contents)> {
        let entries = self.entries.lock();
        entries
            .values()
            .filter(|b| &b.key != exclude)
            .map(|b| {
                let contents = match b.view() {
                    Some(view) => Contents::Live(view.text.snapshot()),
                    None => Contents::Lines(b.lines()),
                };
                (b.path.clone(), contents)
            })
            .collect()
    }

    /// Paths with their last loaded or saved lines and mtimes, as cached.
    pub fn cache_snapshot(&self) -> Vec<(PathBuf, CachedFile)> {
        let entries = self.entries.lock();
        entries
            .values()
            .map(|b| {
                let cached = CachedFile {
                    lines: b.lines().as_ref().clone(),
                    mtime: b.mtime,
                };
                (b.path.clone(), cached)
            })
            .collect()
    }
}

impl std::fmt::Debug for BufferStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferStore")
            .field("keys", &self.keys())
            .finish()
    }
}
