//! Keyboard mapping to logical actions.
//!
//! The front-end translates its native key events into [`KeyPress`]
//! values and asks the [`Keymap`] which [`Action`] they trigger. Default
//! bindings can be overridden from `settings.toml`:
//!
//! ```toml
//! [bindings]
//! "ctrl+g" = "find"
//! ```

use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::config::EditorConfig;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
    };

    pub const CTRL_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift
    }

    /// Parses modifiers from a string like "ctrl+shift".
    pub fn parse(s: &str) -> Self {
        let mut mods = Modifiers::NONE;
        for part in s.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => mods.ctrl = true,
                "alt" | "option" => mods.alt = true,
                "shift" => mods.shift = true,
                _ => {}
            }
        }
        mods
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Left,
    Right,
    Up,
    Down,
    F(u8),
}

impl Key {
    /// Parses a key name. Single characters are lowercased so that
    /// `ctrl+S` and `ctrl+s` name the same key.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "backspace" | "bs" => Some(Key::Backspace),
            "delete" | "del" => Some(Key::Delete),
            "escape" | "esc" => Some(Key::Escape),
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            _ if lower.len() > 1 && lower.starts_with('f') => lower[1..].parse().ok().map(Key::F),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_uppercase()),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Escape => write!(f, "Escape"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::F(n) => write!(f, "F{}", n),
        }
    }
}

/// A key press event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Parses a binding string like "ctrl+shift+left".
    pub fn parse(s: &str) -> Option<Self> {
        let (mods, key) = match s.rsplit_once('+') {
            // "ctrl++" binds the plus key
            Some((mods, "")) => (mods.strip_suffix('+').unwrap_or(mods), "+"),
            Some((mods, key)) => (mods, key),
            None => ("", s),
        };
        Some(Self {
            key: Key::parse(key)?,
            modifiers: Modifiers::parse(mods),
        })
    }
}

impl fmt::Display for KeyPress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// Logical editor actions a key can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // Palette commands
    Open,
    SwitchTab,
    Find,
    FindAll,
    Exec,
    SaveAs,
    Cache,

    // Buffer
    Save,
    Close,
    Undo,
    Redo,
    SelectAll,
    InsertTab,
    Backspace,
    FollowLink,

    // Word-wise movement and deletion
    WordLeft,
    WordRight,
    ExtendWordLeft,
    ExtendWordRight,
    DeleteWordLeft,
    DeleteWordRight,

    // Window
    Fullscreen,
    ShowLog,
    OpenConfig,
}

impl Action {
    /// Parses the action names used in `settings.toml`.
    pub fn parse(s: &str) -> Option<Self> {
        let action = match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Action::Open,
            "tab" | "switch_tab" => Action::SwitchTab,
            "find" => Action::Find,
            "find_all" => Action::FindAll,
            "exec" => Action::Exec,
            "save_as" => Action::SaveAs,
            "cache" => Action::Cache,
            "save" => Action::Save,
            "close" => Action::Close,
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "select_all" => Action::SelectAll,
            "insert_tab" => Action::InsertTab,
            "backspace" => Action::Backspace,
            "follow_link" | "goto_link" => Action::FollowLink,
            "word_left" => Action::WordLeft,
            "word_right" => Action::WordRight,
            "extend_word_left" => Action::ExtendWordLeft,
            "extend_word_right" => Action::ExtendWordRight,
            "delete_word_left" => Action::DeleteWordLeft,
            "delete_word_right" => Action::DeleteWordRight,
            "fullscreen" => Action::Fullscreen,
            "show_log" => Action::ShowLog,
            "open_config" => Action::OpenConfig,
            _ => return None,
        };
        Some(action)
    }
}

/// Key press -> action table.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<KeyPress, Action>,
}

impl Keymap {
    /// Creates a keymap with the default bindings.
    pub fn new() -> Self {
        let mut keymap = Self {
            bindings: HashMap::new(),
        };
        keymap.add_default_bindings();
        keymap
    }

    /// Default bindings plus the overrides from `config`.
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut keymap = Self::new();
        for (key_str, action_str) in &config.bindings {
            match (KeyPress::parse(key_str), Action::parse(action_str)) {
                (Some(key), Some(action)) => keymap.bind(key, action),
                _ => warn!("Ignoring key binding '{}' = '{}'", key_str, action_str),
            }
        }
        keymap
    }

    fn add_default_bindings(&mut self) {
        use Action::*;

        let ctrl = |c: char| KeyPress::new(Key::Char(c), Modifiers::CTRL);
        let bindings = [
            (ctrl('o'), Open),
            (ctrl('t'), SwitchTab),
            (ctrl('f'), Find),
            (ctrl('j'), FindAll),
            (ctrl('e'), Exec),
            (ctrl('k'), Cache),
            (KeyPress::new(Key::Char('s'), Modifiers::CTRL_SHIFT), SaveAs),
            (ctrl('s'), Save),
            (ctrl('w'), Close),
            (ctrl('z'), Undo),
            (ctrl('y'), Redo),
            (ctrl('a'), SelectAll),
            (ctrl('g'), FollowLink),
            (ctrl('p'), ShowLog),
            (ctrl('m'), OpenConfig),
            (KeyPress::new(Key::Tab, Modifiers::NONE), InsertTab),
            (KeyPress::new(Key::Backspace, Modifiers::NONE), Backspace),
            (KeyPress::new(Key::Left, Modifiers::CTRL), WordLeft),
            (KeyPress::new(Key::Right, Modifiers::CTRL), WordRight),
            (KeyPress::new(Key::Left, Modifiers::CTRL_SHIFT), ExtendWordLeft),
            (KeyPress::new(Key::Right, Modifiers::CTRL_SHIFT), ExtendWordRight),
            (KeyPress::new(Key::Backspace, Modifiers::CTRL), DeleteWordLeft),
            (KeyPress::new(Key::Delete, Modifiers::CTRL), DeleteWordRight),
            (KeyPress::new(Key::F(11), Modifiers::NONE), Fullscreen),
        ];

        for (key, action) in bindings {
            self.bindings.insert(key, action);
        }
    }

    /// Binds `key`, replacing any previous binding.
    pub fn bind(&mut self, key: KeyPress, action: Action) {
        self.bindings.insert(key, action);
    }

    /// The action bound to `key`.
    pub fn lookup(&self, key: &KeyPress) -> Option<Action> {
        self.bindings.get(key).copied()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}
