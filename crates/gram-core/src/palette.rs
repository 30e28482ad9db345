//! The command palette.
//!
//! The palette is one line of text read as `"<command>: <argument>"`. Text
//! without the `": "` delimiter, or whose left side is not a registered
//! command, filters command names instead.
//!
//! ## Completion staleness
//!
//! Completions are computed on worker threads. Each request takes a
//! ticket from the [`CompletionGuard`]; a result is only applied if its
//! ticket is still the latest one issued when it arrives, so a slow
//! result for `"open: a"` can never replace the list for `"open: ab"`.

use gram_buffer::Direction;
use gram_buffer::breaks::boundary_range;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Range;

use crate::command::CommandRegistry;

/// Separates a command name from its argument.
pub const DELIMITER: &str = ": ";

/// How the current palette text parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteState {
    Empty,
    /// Filtering command names
    CommandFilter(String),
    /// Typing the argument of a known command
    ArgumentEntry { command: String, arg: String },
}

/// A committed palette line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub command: String,
    pub arg: String,
    /// Submitted with Shift held
    pub shift: bool,
}

// ==================== Completion guard ====================

#[derive(Debug, Default)]
struct GuardState {
    latest: u64,
    results: Vec<String>,
    /// The latest query has been answered
    settled: bool,
}

/// Last-query-wins gate for asynchronous completion results.
#[derive(Debug, Default)]
pub struct CompletionGuard {
    state: Mutex<GuardState>,
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new query, superseding all earlier ones, and clears the
    /// shown results.
    pub fn issue(&self) -> u64 {
        let mut state = self.state.lock();
        state.latest += 1;
        state.results.clear();
        state.settled = false;
        state.latest
    }

    /// Applies `results` if `ticket` is still the latest query. Returns
    /// whether they were applied.
    pub fn deliver(&self, ticket: u64, results: Vec<String>) -> bool {
        let mut state = self.state.lock();
        if ticket != state.latest {
            return false;
        }
        state.results = results;
        state.settled = true;
        true
    }

    /// Returns true once the latest query has results.
    pub fn is_settled(&self) -> bool {
        self.state.lock().settled
    }

    /// The results currently shown.
    pub fn results(&self) -> Vec<String> {
        self.state.lock().results.clone()
    }
}

// ==================== Palette ====================

#[derive(Debug, Default)]
pub struct Palette {
    text: String,
    /// Selected character range
    selection: Option<Range<usize>>,
    /// Last argument typed for each command
    saved_args: HashMap<String, String>,
    /// Text the latest completion request was made for
    last_query: Option<String>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    /// Replaces the text and drops the selection.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.selection = None;
    }

    /// Parses the current text.
    pub fn state(&self, registry: &CommandRegistry) -> PaletteState {
        if self.text.is_empty() {
            return PaletteState::Empty;
        }
        match self.text.split_once(DELIMITER) {
            Some((command, arg)) if registry.contains(command) => PaletteState::ArgumentEntry {
                command: command.to_string(),
                arg: arg.to_string(),
            },
            _ => PaletteState::CommandFilter(self.text.clone()),
        }
    }

    /// Switches the palette to `command`.
    ///
    /// The argument of the command being left is remembered; the palette
    /// becomes `"<command>: "` plus the argument last used with `command`,
    /// and that argument is selected for overtyping.
    pub fn palette_op(&mut self, command: &str) {
        if let Some((old, old_arg)) = self.text.split_once(':') {
            self.saved_args.insert(old.to_string(), old_arg.to_string());
        }
        let restored = self
            .saved_args
            .get(command)
            .cloned()
            .unwrap_or_else(|| " ".to_string());
        self.text = format!("{}:{}", command, restored);
        self.select_argument();
    }

    /// Selects the argument part, or everything without a command prefix.
    pub fn select_argument(&mut self) {
        let len = self.text.chars().count();
        let start = match self.text.find(':') {
            Some(idx) => (self.text[..idx].chars().count() + 2).min(len),
            None => 0,
        };
        self.selection = Some(start..len);
    }

    /// Types `s` over the selection, or at the end.
    pub fn type_text(&mut self, s: &str) {
        match self.selection.take() {
            Some(range) => {
                let start = byte_offset(&self.text, range.start);
                let end = byte_offset(&self.text, range.end);
                self.text.replace_range(start..end, s);
            }
            None => self.text.push_str(s),
        }
    }

    /// Deletes from the end of the text to the previous (or, forward,
    /// from the start to the next) word boundary.
    pub fn delete_to_break(&mut self, direction: Direction) {
        let len = self.text.chars().count();
        let cursor = match direction {
            Direction::Backward => len,
            Direction::Forward => self.selection.as_ref().map_or(len, |r| r.start),
        };
        let range = boundary_range(&self.text, cursor, direction);
        let start = byte_offset(&self.text, range.start);
        let end = byte_offset(&self.text, range.end);
        self.text.replace_range(start..end, "");
        self.selection = None;
    }

    /// Commits the text. Returns `None` when it has no `": "`; whether the
    /// command exists is up to the caller.
    pub fn submit(&self, shift: bool) -> Option<Submission> {
        let (command, arg) = self.text.split_once(DELIMITER)?;
        Some(Submission {
            command: command.to_string(),
            arg: arg.to_string(),
            shift,
        })
    }

    /// Replaces the argument with a chosen completion, keeping the
    /// `"<command>: "` prefix. Without a prefix the whole text is replaced.
    pub fn apply_completion(&mut self, choice: &str) {
        let prefix = match self.text.find(':') {
            Some(idx) => format!("{}{}", &self.text[..idx], DELIMITER),
            None => String::new(),
        };
        self.text = format!("{}{}", prefix, choice);
        self.selection = None;
    }

    /// Records `text` as the latest completion query. Returns false if
    /// it equals the previous query and `force` is not set.
    pub(crate) fn begin_query(&mut self, force: bool) -> bool {
        if !force && self.last_query.as_deref() == Some(self.text.as_str()) {
            return false;
        }
        self.last_query = Some(self.text.clone());
        true
    }
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandContext, CommandHandler};
    use crate::CoreResult;
    use std::sync::Arc;

    struct Noop(&'static str);

    impl CommandHandler for Noop {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&self, _ctx: &mut CommandContext, _arg: &str) -> CoreResult<()> {
            Ok(())
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Noop("open")), None, None);
        registry.register(Arc::new(Noop("find")), None, None);
        registry.register(Arc::new(Noop("find all")), None, None);
        registry
    }

    #[test]
    fn test_states() {
        let registry = registry();
        let mut palette = Palette::new();
        assert_eq!(palette.state(&registry), PaletteState::Empty);

        palette.set_text("fi");
        assert_eq!(
            palette.state(&registry),
            PaletteState::CommandFilter("fi".into())
        );

        palette.set_text("find all: needle");
        assert_eq!(
            palette.state(&registry),
            PaletteState::ArgumentEntry {
                command: "find all".into(),
                arg: "needle".into()
            }
        );

        palette.set_text("nope: x");
        assert_eq!(
            palette.state(&registry),
            PaletteState::CommandFilter("nope: x".into())
        );
    }

    #[test]
    fn test_palette_op_restores_argument() {
        let mut palette = Palette::new();
        palette.palette_op("find");
        assert_eq!(palette.text(), "find: ");
        assert_eq!(palette.selection(), Some(6..6));

        palette.type_text("needle");
        assert_eq!(palette.text(), "find: needle");

        palette.palette_op("open");
        assert_eq!(palette.text(), "open: ");

        palette.palette_op("find");
        assert_eq!(palette.text(), "find: needle");
        assert_eq!(palette.selection(), Some(6..12));

        palette.type_text("other");
        assert_eq!(palette.text(), "find: other");
    }

    #[test]
    fn test_submit() {
        let mut palette = Palette::new();
        palette.set_text("open: a.txt");
        assert_eq!(
            palette.submit(true),
            Some(Submission {
                command: "open".into(),
                arg: "a.txt".into(),
                shift: true
            })
        );
        palette.set_text("open");
        assert_eq!(palette.submit(false), None);
    }

    #[test]
    fn test_apply_completion() {
        let mut palette = Palette::new();
        palette.set_text("open: sr");
        palette.apply_completion("src/");
        assert_eq!(palette.text(), "open: src/");

        palette.set_text("op");
        palette.apply_completion("open: ");
        assert_eq!(palette.text(), "open: ");
    }

    #[test]
    fn test_delete_to_break() {
        let mut palette = Palette::new();
        palette.set_text("open: src/main.rs");
        palette.delete_to_break(Direction::Backward);
        assert_eq!(palette.text(), "open: src/main.");
        palette.delete_to_break(Direction::Backward);
        assert_eq!(palette.text(), "open: src/main");
    }

    #[test]
    fn test_guard_last_query_wins() {
        let guard = CompletionGuard::new();
        let a = guard.issue();
        let ab = guard.issue();

        assert!(!guard.is_settled());
        assert!(guard.deliver(ab, vec!["ab.txt".into()]));
        assert!(guard.is_settled());
        assert!(!guard.deliver(a, vec!["a.txt".into(), "ab.txt".into()]));
        assert_eq!(guard.results(), vec!["ab.txt".to_string()]);
    }

    #[test]
    fn test_guard_concurrent_deliveries() {
        let guard = Arc::new(CompletionGuard::new());
        let tickets: Vec<u64> = (0..8).map(|_| guard.issue()).collect();
        let latest = *tickets.last().unwrap();

        let handles: Vec<_> = tickets
            .into_iter()
            .map(|ticket| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.deliver(ticket, vec![ticket.to_string()]))
            })
            .collect();
        let applied: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(applied.iter().filter(|a| **a).count(), 1);
        assert_eq!(guard.results(), vec![latest.to_string()]);
    }

    #[test]
    fn test_begin_query_dedups() {
        let mut palette = Palette::new();
        palette.set_text("open: a");
        assert!(palette.begin_query(false));
        assert!(!palette.begin_query(false));
        assert!(palette.begin_query(true));
        palette.set_text("open: ab");
        assert!(palette.begin_query(false));
    }
}
