//! Palette command registry.
//!
//! A command is a name plus a [`CommandHandler`], an optional
//! [`CompletionProvider`] and an optional key binding that opens the
//! palette on it. Commands are registered once at startup; registering a
//! name twice is a wiring bug and panics.

use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::complete::GlobCache;
use crate::editor::Editor;
use crate::keymap::Action;
use crate::palette::DELIMITER;
use crate::CoreResult;

/// Context passed to command execution.
pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
    /// Submitted with Shift held
    pub shift: bool,
}

/// Runs a submitted command.
pub trait CommandHandler: Send + Sync {
    /// The palette name, e.g. `"find all"`.
    fn name(&self) -> &str;

    /// Executes the command with the text after `": "`.
    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()>;

    /// Returns a description for the command palette.
    fn description(&self) -> &str {
        self.name()
    }
}

/// Everything a completion provider may look at. Built on the GUI thread
/// and moved to the worker that computes the completions.
#[derive(Debug, Clone)]
pub struct CompletionEnv {
    /// Directory relative paths resolve against
    pub workdir: PathBuf,
    /// Where cache blobs live
    pub data_dir: PathBuf,
    /// Paths of open buffers, most recent first
    pub open_paths: Vec<PathBuf>,
    /// Glob expansions since the last open
    pub globs: Arc<GlobCache>,
}

/// Maps a partial argument to ranked candidates. Runs off the GUI thread.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, env: &CompletionEnv, fragment: &str) -> Vec<String>;
}

/// One registered command.
#[derive(Clone)]
pub struct CommandEntry {
    pub handler: Arc<dyn CommandHandler>,
    pub completion: Option<Arc<dyn CompletionProvider>>,
    pub binding: Option<Action>,
}

/// Registry of palette commands, in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    entries: IndexMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command.
    ///
    /// # Panics
    ///
    /// If a command with the same name is already registered.
    pub fn register(
        &mut self,
        handler: Arc<dyn CommandHandler>,
        completion: Option<Arc<dyn CompletionProvider>>,
        binding: Option<Action>,
    ) {
        let name = handler.name().to_string();
        assert!(
            !self.entries.contains_key(&name),
            "'{}' already registered",
            name
        );
        self.entries.insert(
            name,
            CommandEntry {
                handler,
                completion,
                binding,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.entries.get(name).map(|e| e.handler.clone())
    }

    pub fn completion(&self, name: &str) -> Option<Arc<dyn CompletionProvider>> {
        self.entries.get(name).and_then(|e| e.completion.clone())
    }

    /// The command a key action opens the palette on.
    pub fn for_binding(&self, action: Action) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| e.binding == Some(action))
            .map(|(name, _)| name.as_str())
    }

    /// All command names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Command names containing `fragment`, ready to type: `"name: "`.
    pub fn name_matches(&self, fragment: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|name| name.contains(fragment))
            .map(|name| format!("{}{}", name, DELIMITER))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl CommandHandler for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&self, _ctx: &mut CommandContext, _arg: &str) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("find")), None, Some(Action::Find));
        registry.register(Arc::new(Named("find all")), None, Some(Action::FindAll));

        assert!(registry.contains("find all"));
        assert!(registry.completion("find").is_none());
        assert_eq!(registry.for_binding(Action::FindAll), Some("find all"));
        assert_eq!(registry.names(), vec!["find", "find all"]);
        assert_eq!(
            registry.name_matches("all"),
            vec!["find all: ".to_string()]
        );
        assert_eq!(registry.name_matches("").len(), 2);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration_panics() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("open")), None, None);
        registry.register(Arc::new(Named("open")), None, None);
    }
}
