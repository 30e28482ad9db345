//! Built-in palette commands.
//!
//! | Command    | Key      | Completion                    |
//! |------------|----------|-------------------------------|
//! | `open`     | Ctrl+O   | glob expansion or directory   |
//! | `tab`      | Ctrl+T   | open buffers                  |
//! | `cache`    | Ctrl+K   | operations and blob names     |
//! | `find`     | Ctrl+F   |                               |
//! | `find all` | Ctrl+J   |                               |
//! | `exec`     | Ctrl+E   |                               |
//! | `save as`  | Ctrl+Shift+S | directory listing         |

mod cache;
mod exec;
mod files;
mod find;

use std::sync::Arc;

use crate::command::{CommandRegistry, CompletionEnv, CompletionProvider};
use crate::complete;
use crate::keymap::Action;

pub use cache::CacheCommand;
pub use exec::ExecCommand;
pub use files::{OpenCommand, SaveAsCommand, TabCommand};
pub use find::{FindAllCommand, FindCommand};

/// A completion provider backed by a plain function.
struct Completer(fn(&CompletionEnv, &str) -> Vec<String>);

impl CompletionProvider for Completer {
    fn complete(&self, env: &CompletionEnv, fragment: &str) -> Vec<String> {
        (self.0)(env, fragment)
    }
}

fn completer(f: fn(&CompletionEnv, &str) -> Vec<String>) -> Option<Arc<dyn CompletionProvider>> {
    Some(Arc::new(Completer(f)))
}

/// The registry with every built-in command.
pub fn builtin() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(
        Arc::new(OpenCommand),
        completer(complete::glob_matches),
        Some(Action::Open),
    );
    registry.register(
        Arc::new(TabCommand),
        completer(complete::tab_matches),
        Some(Action::SwitchTab),
    );
    registry.register(
        Arc::new(CacheCommand),
        completer(complete::cache_matches),
        Some(Action::Cache),
    );
    registry.register(Arc::new(FindCommand), None, Some(Action::Find));
    registry.register(Arc::new(FindAllCommand), None, Some(Action::FindAll));
    registry.register(Arc::new(ExecCommand), None, Some(Action::Exec));
    registry.register(
        Arc::new(SaveAsCommand),
        completer(complete::open_matches),
        Some(Action::SaveAs),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = builtin();
        assert_eq!(
            registry.names(),
            vec!["open", "tab", "cache", "find", "find all", "exec", "save as"]
        );
        assert_eq!(registry.for_binding(Action::FindAll), Some("find all"));
        assert!(registry.completion("open").is_some());
        assert!(registry.completion("find").is_none());
    }
}
