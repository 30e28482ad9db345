//! Main editor orchestration.
//!
//! `Editor` is the facade a front-end talks to. It owns the buffer store,
//! the palette and its command registry, the configuration and the
//! background scheduler, and it lives on the GUI thread. Front-ends feed
//! it key presses and view changes and render from [`EditorEvent`]s.

use gram_buffer::breaks::boundary_range;
use gram_buffer::{Direction, Position, find_boundary};
use gram_syntax::LanguageRegistry;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::buffer::{Buffer, LiveView};
use crate::cache::{self, CachedFile};
use crate::command::{CommandContext, CommandRegistry, CompletionEnv};
use crate::commands;
use crate::complete::GlobCache;
use crate::config::{Config, EditorConfig};
use crate::event::{EditorEvent, EventBus};
use crate::gui::{GuiQueue, GuiSender};
use crate::key::{BufferKey, resolve};
use crate::keymap::{Action, KeyPress, Keymap};
use crate::palette::{CompletionGuard, Palette, PaletteState};
use crate::scheduler::WorkScheduler;
use crate::session::Session;
use crate::store::BufferStore;
use crate::{CoreError, CoreResult, links, script, search, watcher};

/// What a toolkit text widget reports back to the core.
pub trait ViewAdapter {
    /// Characters `removed` of the active view were replaced by `inserted`.
    fn on_content_changed(&mut self, removed: Range<usize>, inserted: &str);

    /// Lines `visible` of the active view are now on screen.
    fn on_view_scrolled(&mut self, visible: Range<usize>);
}

/// Window position and size, as passed between instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parses `geo=[x, y, w, h]`.
    pub fn parse(arg: &str) -> Option<Self> {
        let inner = arg
            .trim()
            .strip_prefix("geo=")?
            .trim()
            .strip_prefix('[')?
            .strip_suffix(']')?;
        let values: Vec<i32> = inner
            .split(',')
            .map(|v| v.trim().parse().ok())
            .collect::<Option<_>>()?;
        match values.as_slice() {
            &[x, y, width, height] => Some(Self::new(x, y, width, height)),
            _ => None,
        }
    }

    /// Where a new instance goes: beside this window, on whichever side
    /// of the screen has more room.
    pub fn adjacent(&self, screen_width: i32) -> Self {
        let center = self.x + self.width / 2;
        let left_half = screen_width > 0 && center.rem_euclid(screen_width) < screen_width / 2;
        let x = if left_half {
            self.x + self.width
        } else {
            self.x - self.width
        };
        Self { x, ..*self }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(0, 0, 800, 600)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "geo=[{}, {}, {}, {}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// The main editor state.
///
/// ## Thread Safety
///
/// `Editor` is owned by the GUI thread. The store, scheduler, event bus
/// and completion guard are shared with workers through `Arc`s; workers
/// hand anything else back through the [`GuiQueue`].
pub struct Editor {
    pub(crate) store: Arc<BufferStore>,
    pub(crate) scheduler: Arc<WorkScheduler>,
    pub(crate) events: EventBus,
    pub(crate) gui: GuiQueue,

    pub(crate) palette: Palette,
    pub(crate) guard: Arc<CompletionGuard>,
    pub(crate) commands: Arc<CommandRegistry>,
    pub(crate) globs: Arc<GlobCache>,

    /// Appearance, hot-reloaded from `config.json`
    pub(crate) config: Config,
    pub(crate) config_mtime: Option<SystemTime>,
    pub(crate) settings: EditorConfig,
    pub(crate) keymap: Keymap,
    pub(crate) session: Session,

    /// The buffer shown in the view
    pub(crate) active: Option<BufferKey>,
    /// Lines currently on screen
    pub(crate) visible: Range<usize>,
    pub(crate) window: Geometry,
    pub(crate) screen_width: i32,

    pub(crate) debug: bool,
    pub(crate) fullscreen: bool,
    pub(crate) should_quit: bool,
}

impl Editor {
    /// Creates an editor for `session`. The calling thread becomes the
    /// GUI thread.
    ///
    /// Unreadable settings or appearance files are logged and replaced
    /// by defaults.
    pub fn new(session: Session) -> CoreResult<Self> {
        let settings = EditorConfig::load_or_default(session.settings_path()).unwrap_or_else(|e| {
            warn!("Ignoring settings: {}", e);
            EditorConfig::default()
        });
        let config_path = session.config_path();
        let config = Config::load_or_create(&config_path).unwrap_or_else(|e| {
            warn!("Ignoring config file://{}: {}", config_path.display(), e);
            Config::default()
        });
        let config_mtime = std::fs::metadata(&config_path)
            .and_then(|m| m.modified())
            .ok();

        let syntax = Arc::new(LanguageRegistry::new()?.with_tree_sitter(settings.tree_sitter));
        let keymap = Keymap::from_config(&settings);
        let stride = settings.tag_line_stride.max(1);

        Ok(Self {
            store: Arc::new(BufferStore::new(syntax)),
            scheduler: Arc::new(WorkScheduler::new(settings.max_threads)),
            events: EventBus::new(),
            gui: GuiQueue::new(),
            palette: Palette::new(),
            guard: Arc::new(CompletionGuard::new()),
            commands: Arc::new(commands::builtin()),
            globs: Arc::new(GlobCache::new()),
            config,
            config_mtime,
            settings,
            keymap,
            session,
            active: None,
            visible: 0..stride * 2,
            window: Geometry::default(),
            screen_width: 1920,
            debug: false,
            fullscreen: false,
            should_quit: false,
        })
    }

    /// Replaces the palette commands. Start from [`commands::builtin`] to
    /// add commands alongside the built-in ones.
    pub fn with_commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = Arc::new(commands);
        self
    }

    // ==================== Accessors ====================

    pub fn store(&self) -> &Arc<BufferStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<WorkScheduler> {
        &self.scheduler
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &EditorConfig {
        &self.settings
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn active(&self) -> Option<&BufferKey> {
        self.active.as_ref()
    }

    pub fn active_path(&self) -> Option<PathBuf> {
        let key = self.active.as_ref()?;
        self.store.with(key, |b| b.path.clone())
    }

    /// Text of the active buffer.
    pub fn active_text(&self) -> Option<String> {
        let key = self.active.as_ref()?;
        self.store
            .with(key, |b| b.view().map(|v| v.text.text().into_owned()))
            .flatten()
    }

    /// Cursor offset in the active buffer.
    pub fn cursor(&self) -> Option<usize> {
        let key = self.active.as_ref()?;
        self.store
            .with(key, |b| b.view().map(|v| v.cursor.head))
            .flatten()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: EditorEvent) {
        self.events.emit(event);
    }

    /// A handle for posting work to this editor from other threads.
    pub fn gui_sender(&self) -> GuiSender {
        self.gui.sender()
    }

    /// Runs everything workers posted for the GUI thread.
    pub fn pump(&mut self) {
        for task in self.gui.drain() {
            task(self);
        }
    }

    /// Runs one file-watcher pass.
    pub fn tick(&mut self) {
        watcher::tick(self);
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        let state = if enabled { "on" } else { "off" };
        info!("debug {}", state);
    }

    /// Records the window geometry and screen width, used to place new
    /// instances.
    pub fn set_window(&mut self, window: Geometry, screen_width: i32) {
        self.window = window;
        self.screen_width = screen_width;
    }

    fn active_key(&self) -> CoreResult<BufferKey> {
        self.active.clone().ok_or(CoreError::NoActiveBuffer)
    }

    /// Runs `f` on the active buffer's live view.
    pub(crate) fn with_view<R>(&self, f: impl FnOnce(&mut LiveView) -> R) -> CoreResult<R> {
        let key = self.active_key()?;
        self.store
            .with_mut(&key, |b| b.view_mut().map(f))
            .flatten()
            .ok_or(CoreError::BufferNotFound(key))
    }

    // ==================== Files ====================

    /// Opens `raw` (absolute, `~`-prefixed or relative to the working
    /// directory) in the view.
    pub fn open_path(&mut self, raw: &str) -> CoreResult<()> {
        let path = resolve(self.session.workdir(), raw);
        self.open_file(&path, false, None)
    }

    /// Shows `path`, loading it if needed, optionally placing the cursor.
    /// Directories are ignored.
    pub fn open_file(
        &mut self,
        path: &Path,
        read_only: bool,
        position: Option<Position>,
    ) -> CoreResult<()> {
        self.globs.clear();
        if path.is_dir() {
            debug!("Not opening directory file://{}", path.display());
            return Ok(());
        }

        let key = BufferKey::new(path);
        if self.active.as_ref() == Some(&key) && position.is_none() {
            return Ok(());
        }

        let existed = self.store.contains(&key);
        let key = self.store.get(path, read_only, None)?;
        if !existed {
            self.emit(EditorEvent::BufferOpened(key.clone()));
        }
        self.activate(key)?;
        if let Some(position) = position {
            self.with_view(|view| view.goto(position))?;
        }
        self.retag_around_cursor()?;
        info!("open: file://{}", path.display());
        Ok(())
    }

    /// Makes `key` the active buffer.
    pub(crate) fn activate(&mut self, key: BufferKey) -> CoreResult<()> {
        self.store.touch(&key);
        self.store.promote(&key)?;
        if self.active.as_ref() != Some(&key) {
            self.active = Some(key.clone());
            self.emit(EditorEvent::ActiveChanged(key));
        }
        self.refresh_title();
        Ok(())
    }

    /// Opens the session log read-only.
    pub fn show_log(&mut self) -> CoreResult<()> {
        let path = self.session.log_path();
        self.open_file(&path, true, None)
    }

    /// Opens the appearance config for editing.
    pub fn open_config(&mut self) -> CoreResult<()> {
        let path = self.session.config_path();
        self.open_file(&path, false, None)
    }

    /// Closes the active buffer and shows the next most recent one.
    /// Closing the last buffer quits.
    pub fn close_active(&mut self) -> CoreResult<()> {
        let key = self.active_key()?;
        self.close(&key)
    }

    pub fn close(&mut self, key: &BufferKey) -> CoreResult<()> {
        let buffer = self
            .store
            .close(key)
            .ok_or_else(|| CoreError::BufferNotFound(key.clone()))?;
        info!("close: file://{}", buffer.path.display());
        self.emit(EditorEvent::BufferClosed(key.clone()));

        if self.active.as_ref() != Some(key) {
            return Ok(());
        }
        self.active = None;
        match self.store.front() {
            Some(next) => {
                self.activate(next)?;
                self.retag_around_cursor()
            }
            None => {
                self.quit();
                Ok(())
            }
        }
    }

    /// Writes the active buffer to its path.
    pub fn save_active(&mut self) -> CoreResult<()> {
        let key = self.active_key()?;
        let (path, text) = self
            .store
            .with(&key, |b| {
                let text = b.view().map(|v| v.text.text().into_owned());
                (b.path.clone(), text.unwrap_or_else(|| b.lines().concat()))
            })
            .ok_or_else(|| CoreError::BufferNotFound(key.clone()))?;

        self.store.save(&path, &text)?;
        info!("save: file://{}", path.display());
        self.emit(EditorEvent::BufferSaved(key));
        self.refresh_title();

        if path == self.session.config_path() {
            self.reload_config();
        }
        Ok(())
    }

    /// Writes the active buffer's text to `raw` and switches to it.
    pub fn save_as(&mut self, raw: &str) -> CoreResult<()> {
        let path = resolve(self.session.workdir(), raw);
        let text = self
            .active_text()
            .ok_or(CoreError::NoActiveBuffer)?;
        self.store.save(&path, &text)?;
        info!("save as: file://{}", path.display());
        self.open_file(&path, false, None)
    }

    /// Opens many files on background threads. They arrive cold.
    pub fn open_many(&mut self, paths: Vec<PathBuf>) {
        let store = self.store.clone();
        let scheduler = self.scheduler.clone();
        let gui = self.gui.sender();

        let spawned = self.scheduler.spawn("open_all", move || {
            let opened = Mutex::new(Vec::new());
            scheduler.run("open_worker", &paths, |chunk| {
                for path in chunk {
                    match store.get(path, false, None) {
                        Ok(key) => opened.lock().push(key),
                        Err(e) => error!("error: {}", e),
                    }
                }
            });
            let opened = opened.into_inner();
            info!("opened {} files", opened.len());
            gui.post(move |editor| {
                for key in opened {
                    editor.emit(EditorEvent::BufferOpened(key));
                }
            });
        });
        if let Err(e) = spawned {
            error!("Could not start opening files: {}", e);
        }
    }

    /// Switches to the open buffer whose shortened path ends with
    /// `fragment`. With `shift` the file opens in a new instance instead.
    pub fn switch_tab(&mut self, fragment: &str, shift: bool) -> CoreResult<()> {
        let paths = self.store.paths();
        let shortened = crate::complete::shorten_paths(&paths);
        let target = paths
            .into_iter()
            .zip(shortened)
            .find(|(_, short)| short.ends_with(fragment))
            .map(|(path, _)| path);

        match target {
            Some(path) if shift => self.spawn_instance(&path),
            Some(path) => self.open_file(&path, false, None)?,
            None => debug!("No open buffer matches '{}'", fragment),
        }
        Ok(())
    }

    /// Asks the front-end to start another instance on `path`, placed
    /// beside this window.
    pub fn spawn_instance(&mut self, path: &Path) {
        let geo = self.window.adjacent(self.screen_width).to_string();
        info!("spawn: file://{} {}", path.display(), geo);
        self.emit(EditorEvent::SpawnInstance {
            path: path.to_path_buf(),
            geo,
        });
    }

    /// Requests exit.
    pub fn quit(&mut self) {
        self.should_quit = true;
        self.emit(EditorEvent::Quit);
    }

    /// Drops session-owned buffers and removes the session directory.
    pub fn shutdown(&mut self) {
        let session = &self.session;
        let dropped = self.store.retain(|_, b| !session.owns(&b.path));
        debug!("Dropped {} session buffers", dropped);
        if let Err(e) = self.session.cleanup() {
            warn!("{}", e);
        }
    }

    // ==================== Caches ====================

    /// Writes every open buffer to the cache blob `name`. Session files
    /// such as the log are left out.
    pub fn save_cache(&mut self, name: &str) -> CoreResult<usize> {
        let session = &self.session;
        let files: Vec<_> = self
            .store
            .cache_snapshot()
            .into_iter()
            .filter(|(path, _)| !session.owns(path))
            .collect();
        info!("Saving {} files to {}", files.len(), name);
        if name.is_empty() {
            return Ok(0);
        }
        cache::save(self.session.data_dir(), name, files)
    }

    /// Replaces the open buffers with the contents of cache blob `name`.
    /// Files load cold in the background; unchanged files skip the disk.
    pub fn load_cache(&mut self, name: &str) -> CoreResult<()> {
        info!("Loading cache {}", name);
        self.show_log()?;
        let data_dir = self.session.data_dir().to_path_buf();
        if !cache::exists(&data_dir, name) {
            warn!("No cache named '{}'", name);
            return Ok(());
        }
        self.clear_buffers();

        let store = self.store.clone();
        let scheduler = self.scheduler.clone();
        let gui = self.gui.sender();
        let name = name.to_string();

        self.scheduler.spawn("load_cache", move || {
            let blob = match cache::load(&data_dir, &name) {
                Ok(blob) => blob,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            info!("Loading {} files from '{}' cache", blob.len(), name);
            let entries: Vec<(String, CachedFile)> = blob.into_iter().collect();
            let opened = Mutex::new(Vec::new());
            scheduler.run("cache_worker", &entries, |chunk| {
                for (path, cached) in chunk {
                    match store.get(Path::new(path), false, Some(cached.clone())) {
                        Ok(key) => opened.lock().push(key),
                        Err(e) => error!("error: {}", e),
                    }
                }
            });
            let opened = opened.into_inner();
            gui.post(move |editor| {
                for key in opened {
                    editor.emit(EditorEvent::BufferOpened(key));
                }
            });
        })?;
        Ok(())
    }

    /// Closes every buffer except the active one.
    pub fn clear_buffers(&mut self) -> usize {
        let active = self.active.clone();
        info!("Clearing cache of {} files.", self.store.len());
        self.store.retain(|key, _| Some(key) == active.as_ref())
    }

    // ==================== Config ====================

    /// Re-reads `config.json`. A file that does not parse leaves the
    /// current appearance in place.
    pub fn reload_config(&mut self) {
        let path = self.session.config_path();
        match Config::load_from(&path) {
            Ok(config) => {
                self.config = config;
                self.config_mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
                info!("Applied config file://{}", path.display());
                self.emit(EditorEvent::ConfigApplied);
            }
            Err(e) => warn!("Config file://{} not applied: {}", path.display(), e),
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        self.emit(EditorEvent::FullscreenToggled(self.fullscreen));
    }

    /// The window title for the active buffer.
    pub fn title(&self) -> String {
        self.active
            .as_ref()
            .and_then(|key| self.store.with(key, Buffer::title))
            .unwrap_or_default()
    }

    pub(crate) fn refresh_title(&self) {
        self.emit(EditorEvent::TitleChanged(self.title()));
    }

    // ==================== Editing ====================

    /// Replaces `removed` with `inserted` in the active buffer, re-tags
    /// the lines around the edit and marks the buffer modified.
    pub fn apply_edit(&mut self, removed: Range<usize>, inserted: &str) -> CoreResult<()> {
        let key = self.active_key()?;
        let stride = self.settings.tag_line_stride;

        let retagged = self
            .store
            .with_mut(&key, |buffer| -> CoreResult<Option<Range<usize>>> {
                if buffer.read_only {
                    return Err(CoreError::ReadOnly(buffer.key.clone()));
                }
                let Some(view) = buffer.view_mut() else {
                    return Ok(None);
                };

                let inserted_len = inserted.chars().count();
                if removed.is_empty() {
                    view.text.insert(removed.start, inserted)?;
                } else if inserted.is_empty() {
                    view.text.delete(removed.clone())?;
                } else {
                    view.text.replace(removed.clone(), inserted)?;
                }
                view.tags.edit(removed.clone(), inserted_len);

                let end = removed.start + inserted_len;
                view.cursor.move_to(end);
                let first = view.text.char_to_line(removed.start).saturating_sub(stride);
                let last = view.text.char_to_line(end) + stride + 1;
                let range = view.retag_lines(first..last);

                buffer.modified = true;
                Ok(Some(range))
            })
            .ok_or_else(|| CoreError::BufferNotFound(key.clone()))??;

        if self.debug {
            debug!("edit {:?} -> {:?}", removed, inserted);
        }
        if let Some(range) = retagged {
            self.emit(EditorEvent::TagsChanged { key, range });
        }
        self.refresh_title();
        Ok(())
    }

    /// Types `text` over the selection, or at the cursor.
    pub fn insert_text(&mut self, text: &str) -> CoreResult<()> {
        let removed = self.with_view(|view| {
            view.cursor
                .selection_range()
                .unwrap_or(view.cursor.head..view.cursor.head)
        })?;
        self.apply_edit(removed, text)
    }

    /// Inserts spaces up to the next tab stop.
    pub fn insert_tab(&mut self) -> CoreResult<()> {
        let tab = self.settings.tab_spaces.max(1);
        let column = self.with_view(|view| view.cursor_position().column)?;
        self.insert_text(&" ".repeat(tab - column % tab))
    }

    /// Deletes the selection, a whole soft tab when the cursor sits on a
    /// tab stop after spaces, or one character.
    pub fn backspace(&mut self) -> CoreResult<()> {
        let tab = self.settings.tab_spaces.max(1);
        let removed = self.with_view(|view| {
            if let Some(selection) = view.cursor.selection_range() {
                return selection;
            }
            let head = view.cursor.head;
            let column = view.cursor_position().column;
            if column > 0 && column % tab == 0 {
                let start = head - tab;
                let soft = view
                    .text
                    .slice(start..head)
                    .is_ok_and(|s| s.chars().all(|c| c == ' '));
                if soft {
                    return start..head;
                }
            }
            head.saturating_sub(1)..head
        })?;
        if removed.is_empty() {
            return Ok(());
        }
        self.apply_edit(removed, "")
    }

    pub fn select_all(&mut self) -> CoreResult<()> {
        self.with_view(|view| {
            let len = view.text.len_chars();
            view.cursor.select_all(len);
        })
    }

    /// Moves (or with `extend`, selects) to the next word boundary on the
    /// cursor's line, crossing the line break at either end.
    pub fn move_word(&mut self, direction: Direction, extend: bool) -> CoreResult<()> {
        self.with_view(|view| {
            let head = view.cursor.head;
            let len = view.text.len_chars();
            let position = view.cursor_position();
            let line = view.text.line_content(position.line).unwrap_or_default();

            let delta = find_boundary(&line, position.column, direction);
            let target = match (delta, direction) {
                (0, Direction::Forward) => (head + 1).min(len),
                (0, Direction::Backward) => head.saturating_sub(1),
                _ => head.saturating_add_signed(delta),
            };
            if extend {
                view.cursor.select_to(target);
            } else {
                view.cursor.move_to(target);
            }
        })
    }

    /// Deletes to the next word boundary, or the line break at either end.
    pub fn delete_word(&mut self, direction: Direction) -> CoreResult<()> {
        let removed = self.with_view(|view| {
            let head = view.cursor.head;
            let len = view.text.len_chars();
            let position = view.cursor_position();
            let line = view.text.line_content(position.line).unwrap_or_default();
            let line_start = head - position.column;

            let range = boundary_range(&line, position.column, direction);
            if !range.is_empty() {
                return line_start + range.start..line_start + range.end;
            }
            match direction {
                Direction::Forward if head < len => head..head + 1,
                Direction::Backward if head > 0 => head - 1..head,
                _ => head..head,
            }
        })?;
        if removed.is_empty() {
            return Ok(());
        }
        self.apply_edit(removed, "")
    }

    pub fn undo(&mut self) -> CoreResult<()> {
        self.history_step(true)
    }

    pub fn redo(&mut self) -> CoreResult<()> {
        self.history_step(false)
    }

    fn history_step(&mut self, undo: bool) -> CoreResult<()> {
        let key = self.active_key()?;
        let visible = self.visible.clone();

        let retagged = self
            .store
            .with_mut(&key, |buffer| -> CoreResult<Option<Range<usize>>> {
                if buffer.read_only {
                    return Err(CoreError::ReadOnly(buffer.key.clone()));
                }
                let Some(view) = buffer.view_mut() else {
                    return Ok(None);
                };
                if undo {
                    view.text.undo()?;
                } else {
                    view.text.redo()?;
                }
                let len = view.text.len_chars();
                view.cursor.clamp(len);
                view.tags.clear();
                let range = view.retag_lines(visible);
                let modified = view.text.is_modified();

                buffer.modified = modified;
                Ok(Some(range))
            })
            .ok_or_else(|| CoreError::BufferNotFound(key.clone()))??;

        if let Some(range) = retagged {
            self.emit(EditorEvent::TagsChanged { key, range });
        }
        self.refresh_title();
        Ok(())
    }

    /// Selects the next (or previous) case-insensitive match of `text`.
    pub fn find(&mut self, text: &str, backward: bool) -> CoreResult<bool> {
        search::find(self, text, backward)
    }

    /// Follows the link under the cursor.
    pub fn follow_link(&mut self) -> CoreResult<()> {
        links::follow(self)
    }

    /// Runs a `;`-separated script.
    pub fn run_script(&mut self, source: &str) -> CoreResult<()> {
        script::run(self, source)
    }

    /// Re-tags the lines around the cursor in the active buffer.
    pub(crate) fn retag_around_cursor(&mut self) -> CoreResult<()> {
        let key = self.active_key()?;
        let stride = self.settings.tag_line_stride.max(1);
        let (range, lines) = self.with_view(|view| {
            let line = view.cursor_position().line;
            let lines = line.saturating_sub(stride)..line + stride;
            (view.retag_lines(lines.clone()), lines)
        })?;
        self.visible = lines;
        self.emit(EditorEvent::TagsChanged { key, range });
        Ok(())
    }

    // ==================== Palette ====================

    /// Switches the palette to `command` and refreshes completions.
    pub fn palette_op(&mut self, command: &str) {
        self.palette.palette_op(command);
        self.emit(EditorEvent::PaletteChanged);
        self.request_completion(false);
    }

    /// Types into the palette.
    pub fn palette_type(&mut self, text: &str) {
        self.palette.type_text(text);
        self.emit(EditorEvent::PaletteChanged);
        self.request_completion(false);
    }

    /// Replaces the palette text.
    pub fn palette_set_text(&mut self, text: &str) {
        self.palette.set_text(text);
        self.emit(EditorEvent::PaletteChanged);
        self.request_completion(false);
    }

    pub fn palette_delete_word(&mut self, direction: Direction) {
        self.palette.delete_to_break(direction);
        self.emit(EditorEvent::PaletteChanged);
        self.request_completion(false);
    }

    /// The completion candidates currently shown.
    pub fn completions(&self) -> Vec<String> {
        self.guard.results()
    }

    /// Returns true once the latest completion request has been answered.
    pub fn completions_ready(&self) -> bool {
        self.guard.is_settled()
    }

    /// Environment handed to completion providers.
    pub fn completion_env(&self) -> CompletionEnv {
        CompletionEnv {
            workdir: self.session.workdir().to_path_buf(),
            data_dir: self.session.data_dir().to_path_buf(),
            open_paths: self.store.paths(),
            globs: self.globs.clone(),
        }
    }

    /// Recomputes completions for the palette text.
    ///
    /// Command-name filtering is answered at once. Argument completion
    /// runs on a `matching` worker and is dropped on arrival if a newer
    /// request was made meanwhile.
    pub fn request_completion(&mut self, force: bool) {
        if !self.palette.begin_query(force) {
            return;
        }
        let ticket = self.guard.issue();
        self.emit(EditorEvent::CompletionsChanged);

        match self.palette.state(&self.commands) {
            PaletteState::ArgumentEntry { command, arg } => {
                let Some(provider) = self.commands.completion(&command) else {
                    self.guard.deliver(ticket, Vec::new());
                    return;
                };
                let env = self.completion_env();
                let guard = self.guard.clone();
                let events = self.events.clone();
                let spawned = self.scheduler.spawn("matching", move || {
                    let results = provider.complete(&env, &arg);
                    if guard.deliver(ticket, results) {
                        events.emit(EditorEvent::CompletionsChanged);
                    } else {
                        debug!("Dropped stale completions for '{}'", arg);
                    }
                });
                if let Err(e) = spawned {
                    warn!("Could not start completion: {}", e);
                }
            }
            PaletteState::CommandFilter(text) => {
                self.guard.deliver(ticket, self.commands.name_matches(&text));
                self.emit(EditorEvent::CompletionsChanged);
            }
            PaletteState::Empty => {
                self.guard.deliver(ticket, self.commands.name_matches(""));
                self.emit(EditorEvent::CompletionsChanged);
            }
        }
    }

    /// Puts completion `index` into the palette.
    pub fn choose_completion(&mut self, index: usize) {
        let Some(choice) = self.guard.results().into_iter().nth(index) else {
            return;
        };
        self.palette.apply_completion(&choice);
        self.emit(EditorEvent::PaletteChanged);
        self.request_completion(false);
    }

    /// Commits the palette line and runs its command.
    pub fn submit(&mut self, shift: bool) {
        let Some(submission) = self.palette.submit(shift) else {
            debug!("Nothing to submit in '{}'", self.palette.text());
            return;
        };
        self.execute(&submission.command, &submission.arg, submission.shift);
    }

    /// Runs palette command `command` with `arg`. Failures are logged.
    pub fn execute(&mut self, command: &str, arg: &str, shift: bool) {
        let Some(handler) = self.commands.handler(command) else {
            debug!("Unknown command '{}'", command);
            return;
        };
        if self.debug {
            debug!("{}: {}", command, arg);
        }
        let mut ctx = CommandContext {
            editor: self,
            shift,
        };
        if let Err(e) = handler.execute(&mut ctx, arg) {
            error!("{}: {}", command, e);
        }
    }

    // ==================== Keys ====================

    /// Handles a key press. Returns false if nothing is bound to it.
    pub fn handle_key(&mut self, key: &KeyPress) -> bool {
        match self.keymap.lookup(key) {
            Some(action) => {
                self.handle_action(action);
                true
            }
            None => false,
        }
    }

    /// Runs a bound action. Failures are logged.
    pub fn handle_action(&mut self, action: Action) {
        if self.debug {
            debug!("action {:?}", action);
        }
        if let Some(command) = self.commands.for_binding(action).map(str::to_string) {
            self.palette_op(&command);
            return;
        }

        let result = match action {
            Action::Save => self.save_active(),
            Action::Close => self.close_active(),
            Action::Undo => self.undo(),
            Action::Redo => self.redo(),
            Action::SelectAll => self.select_all(),
            Action::InsertTab => self.insert_tab(),
            Action::Backspace => self.backspace(),
            Action::FollowLink => self.follow_link(),
            Action::WordLeft => self.move_word(Direction::Backward, false),
            Action::WordRight => self.move_word(Direction::Forward, false),
            Action::ExtendWordLeft => self.move_word(Direction::Backward, true),
            Action::ExtendWordRight => self.move_word(Direction::Forward, true),
            Action::DeleteWordLeft => self.delete_word(Direction::Backward),
            Action::DeleteWordRight => self.delete_word(Direction::Forward),
            Action::ShowLog => self.show_log(),
            Action::OpenConfig => self.open_config(),
            Action::Fullscreen => {
                self.toggle_fullscreen();
                Ok(())
            }
            other => {
                debug!("No command bound for {:?}", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("{:?}: {}", action, e);
        }
    }
}

impl ViewAdapter for Editor {
    fn on_content_changed(&mut self, removed: Range<usize>, inserted: &str) {
        if let Err(e) = self.apply_edit(removed, inserted) {
            warn!("Edit rejected: {}", e);
        }
    }

    fn on_view_scrolled(&mut self, visible: Range<usize>) {
        let Some(key) = self.active.clone() else {
            return;
        };
        let stride = self.settings.tag_line_stride;
        let lines = visible.start.saturating_sub(stride)..visible.end + stride;
        self.visible = visible;
        match self.with_view(|view| view.retag_lines(lines)) {
            Ok(range) => self.emit(EditorEvent::TagsChanged { key, range }),
            Err(e) => debug!("{}", e),
        }
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("active", &self.active)
            .field("buffers", &self.store.len())
            .field("palette", &self.palette.text())
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn editor() -> (TempDir, Editor) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        (dir, Editor::new(session).unwrap())
    }

    fn open(editor: &mut Editor, dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        editor.open_file(&path, false, None).unwrap();
        path
    }

    #[test]
    fn test_geometry() {
        let geo = Geometry::parse("geo=[100, 20, 800, 600]").unwrap();
        assert_eq!(geo, Geometry::new(100, 20, 800, 600));
        assert_eq!(geo.to_string(), "geo=[100, 20, 800, 600]");
        assert_eq!(geo.adjacent(1920).x, 900);
        assert_eq!(Geometry::new(1200, 0, 600, 400).adjacent(1920).x, 600);
        assert!(Geometry::parse("geo=[1,2,3]").is_none());
    }

    #[test]
    fn test_open_and_type() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "notes.txt", "");
        editor.insert_text("hello").unwrap();

        assert_eq!(editor.active_text().as_deref(), Some("hello"));
        assert_eq!(editor.cursor(), Some(5));
        assert_eq!(editor.title(), "notes.txt*");

        editor.save_active().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "hello");
        assert_eq!(editor.title(), "notes.txt");
    }

    #[test]
    fn test_open_directory_is_noop() {
        let (dir, mut editor) = editor();
        editor.open_file(dir.path(), false, None).unwrap();
        assert!(editor.active().is_none());
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let (dir, mut editor) = editor();
        let path = dir.path().join("log.txt");
        fs::write(&path, "line\n").unwrap();
        editor.open_file(&path, true, None).unwrap();

        assert_eq!(editor.cursor(), Some(5));
        assert!(matches!(
            editor.insert_text("x"),
            Err(CoreError::ReadOnly(_))
        ));
        assert_eq!(editor.title(), "log.txt  (read only)");
    }

    #[test]
    fn test_insert_tab_and_soft_backspace() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "");
        editor.insert_tab().unwrap();
        editor.insert_tab().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("        "));
        editor.backspace().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("    "));

        editor.insert_text("ab").unwrap();
        editor.insert_tab().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("    ab  "));
        // Not all spaces behind the tab stop: one character goes.
        editor.backspace().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("    ab "));
    }

    #[test]
    fn test_word_movement_and_deletion() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "foo)))bar\nnext");

        editor.move_word(Direction::Forward, false).unwrap();
        assert_eq!(editor.cursor(), Some(3));
        editor.move_word(Direction::Forward, false).unwrap();
        assert_eq!(editor.cursor(), Some(6));
        editor.move_word(Direction::Forward, false).unwrap();
        assert_eq!(editor.cursor(), Some(9));
        editor.move_word(Direction::Forward, false).unwrap();
        assert_eq!(editor.cursor(), Some(10));

        editor.delete_word(Direction::Backward).unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("foo)))barnext"));
        editor.delete_word(Direction::Backward).unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("foo)))next"));
    }

    #[test]
    fn test_select_all_then_type() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "old text");
        editor.select_all().unwrap();
        editor.insert_text("new").unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("new"));
    }

    #[test]
    fn test_undo_clears_modified() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "abc");
        editor.insert_text("x").unwrap();
        assert!(editor.title().ends_with('*'));

        editor.undo().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("abc"));
        assert_eq!(editor.title(), "a.txt");

        editor.redo().unwrap();
        assert_eq!(editor.active_text().as_deref(), Some("xabc"));
    }

    #[test]
    fn test_close_falls_back_to_previous() {
        let (dir, mut editor) = editor();
        let first = open(&mut editor, &dir, "a.txt", "a");
        open(&mut editor, &dir, "b.txt", "b");

        editor.close_active().unwrap();
        assert_eq!(editor.active_path(), Some(first));
        editor.close_active().unwrap();
        assert!(editor.should_quit());
    }

    #[test]
    fn test_switch_tab() {
        let (dir, mut editor) = editor();
        let first = open(&mut editor, &dir, "alpha.txt", "a");
        open(&mut editor, &dir, "beta.txt", "b");

        editor.switch_tab("alpha.txt", false).unwrap();
        assert_eq!(editor.active_path(), Some(first));
    }

    #[test]
    fn test_command_filter_completions() {
        let (_dir, mut editor) = editor();
        editor.palette_set_text("fin");
        assert_eq!(
            editor.completions(),
            vec!["find: ".to_string(), "find all: ".to_string()]
        );
    }

    #[test]
    fn test_clear_buffers_keeps_active() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "a");
        open(&mut editor, &dir, "b.txt", "b");
        assert_eq!(editor.clear_buffers(), 1);
        assert_eq!(editor.store().len(), 1);
        assert!(editor.active_text().is_some());
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let (dir, mut editor) = editor();
        open(&mut editor, &dir, "a.txt", "a");
        let active = editor.active().cloned();
        editor.execute("frobnicate", "x", false);
        assert_eq!(editor.active().cloned(), active);
        assert_eq!(editor.active_text().as_deref(), Some("a"));
        assert_eq!(editor.store().len(), 1);
    }

    #[test]
    fn test_save_cache_skips_session_files() {
        let (dir, mut editor) = editor();
        let path = open(&mut editor, &dir, "a.txt", "a");
        editor.show_log().unwrap();
        assert_eq!(editor.store().len(), 2);

        assert_eq!(editor.save_cache("work").unwrap(), 1);
        let blob = cache::load(editor.session().data_dir(), "work").unwrap();
        let session_dir = crate::key::slashed(editor.session().session_dir());
        assert!(blob.keys().all(|p| !p.starts_with(&session_dir)));
        assert!(blob.contains_key(&crate::key::slashed(&path)));
    }

    #[test]
    fn test_shutdown_removes_session_dir() {
        let (_dir, mut editor) = editor();
        editor.show_log().unwrap();
        let session_dir = editor.session().session_dir().to_path_buf();
        editor.shutdown();
        assert!(!session_dir.exists());
        assert!(editor.store().is_empty());
    }
}
