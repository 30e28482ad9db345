//! # Gram Core
//!
//! The editor session: buffers, the command palette, background work and
//! file watching. Rendering lives elsewhere; the core talks to it through
//! [`EditorEvent`]s and the [`ViewAdapter`] trait.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Editor                             │
//! │  ┌──────────┐ ┌──────────────┐ ┌────────────┐ ┌──────────┐ │
//! │  │ Palette  │ │ CommandRegis-│ │  Config /  │ │ EventBus │ │
//! │  │ + Guard  │ │ try+builtins │ │  Keymap    │ │ GuiQueue │ │
//! │  └──────────┘ └──────────────┘ └────────────┘ └──────────┘ │
//! │        │                                                    │
//! │  ┌─────┴──────────────────────────────┐  ┌───────────────┐ │
//! │  │      BufferStore (MRU, locked)     │◄─┤ WorkScheduler │ │
//! │  │   cold: raw lines  hot: LiveView   │  │ (worker pool) │ │
//! │  └────────────────────────────────────┘  └───────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threads
//!
//! The thread that creates the [`Editor`] is the GUI thread. Only it
//! creates or touches live views. Workers load cold buffers through the
//! store's lock and hand anything else back with [`GuiSender::post`].

pub mod buffer;
pub mod cache;
pub mod command;
pub mod commands;
pub mod complete;
pub mod config;
pub mod editor;
pub mod event;
pub mod gui;
pub mod key;
pub mod keymap;
pub mod links;
pub mod palette;
pub mod scheduler;
pub mod script;
pub mod search;
pub mod session;
pub mod store;
pub mod watcher;

pub use buffer::{Buffer, LiveView};
pub use command::{CommandContext, CommandHandler, CommandRegistry, CompletionEnv};
pub use config::{Config, ConfigError, EditorConfig};
pub use editor::{Editor, ViewAdapter};
pub use event::{EditorEvent, EventBus, EventHandler};
pub use gui::{GuiQueue, GuiSender};
pub use key::BufferKey;
pub use keymap::{Action, Key, KeyPress, Keymap, Modifiers};
pub use palette::{CompletionGuard, Palette, PaletteState, Submission};
pub use scheduler::WorkScheduler;
pub use session::Session;
pub use store::BufferStore;

use std::path::PathBuf;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Buffer not found: {0}")]
    BufferNotFound(BufferKey),

    #[error("No active buffer")]
    NoActiveBuffer,

    #[error("Buffer is read only: {0}")]
    ReadOnly(BufferKey),

    #[error("Not a file: file://{}", .0.display())]
    NotAFile(PathBuf),

    #[error("Live views can only be created on the GUI thread")]
    NotGuiThread,

    #[error("IO error on file://{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] gram_buffer::BufferError),

    #[error("Syntax error: {0}")]
    Syntax(#[from] gram_syntax::SyntaxError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("Script error: {0}")]
    Script(String),
}

impl CoreError {
    /// Wraps an I/O error with the file it happened on.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::File {
            path: path.into(),
            source,
        }
    }
}
