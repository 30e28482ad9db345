//! Editor configuration.
//!
//! Two files live in the data directory:
//!
//! - `config.json`: colors and font (`text`) and per-tag styles (`tags`).
//!   Created with defaults on first run and hot-reloaded by the watcher.
//! - `settings.toml`: optional editor tunables and key binding overrides.
//!
//! `#[serde(default)]` fills in missing fields, so partial files work.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use crate::scheduler::DEFAULT_MAX_THREADS;

/// Appearance configuration (`config.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text widget appearance
    pub text: TextStyle,

    /// Tag name -> style
    pub tags: BTreeMap<String, TagStyle>,
}

impl Config {
    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Loads config, writing the defaults first if the file is missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Writing default config to file://{}", path.display());
            Self::default().save_to(path)?;
        }
        Self::load_from(path)
    }

    /// Saves the config as pretty JSON.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Foreground color for a tag, if styled.
    pub fn tag_color(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(|style| style.foreground.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        let tags = [
            // parser tag names
            ("number", "white"),
            ("property", "teal"),
            ("constant", "yellow"),
            ("attribute", "orange"),
            ("punctuation.bracket", "white"),
            ("comment", "green"),
            ("function.builtin", "teal"),
            ("constant.builtin", "cyan"),
            ("punctuation.delimiter", "white"),
            ("string.special", "limegreen"),
            ("tag", "blue"),
            ("type.builtin", "skyblue"),
            ("embedded", "grey"),
            ("variable.builtin", "limegreen"),
            ("function", "orange"),
            ("type", "orange"),
            ("variable.parameter", "white"),
            ("string", "lightgreen"),
            ("module", "purple"),
            ("operator", "white"),
            ("keyword", "magenta"),
            ("constructor", "green"),
            // regex grammar tag names
            ("exception", "#880000"),
            ("builtin", "#FFD700"),
            ("docstring", "#008000"),
            ("types", "#FFD700"),
            ("classdef", "#8080FF"),
            ("decorator", "#FF00FF"),
            ("instance", "limegreen"),
            ("brackets", "white"),
            ("symbols", "white"),
            ("xmltag", "skyblue"),
            ("links", "deepskyblue"),
        ]
        .into_iter()
        .map(|(tag, fg)| (tag.to_string(), TagStyle::new(fg)))
        .collect();

        Self {
            text: TextStyle::default(),
            tags,
        }
    }
}

/// Font family and size; serialized as `["Fira Mono", 12]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec(pub String, pub u32);

/// Text widget appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub foreground: String,
    pub background: String,
    pub font: FontSpec,
    pub selectforeground: String,
    pub selectbackground: String,
    pub insertbackground: String,
    pub highlightthickness: u32,
    pub highlightcolor: String,
    pub highlightbackground: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            foreground: "gray72".to_string(),
            background: "gray16".to_string(),
            font: FontSpec("Fira Mono".to_string(), 12),
            selectforeground: "gray99".to_string(),
            selectbackground: "gray24".to_string(),
            insertbackground: "white".to_string(),
            highlightthickness: 8,
            highlightcolor: "gray24".to_string(),
            highlightbackground: "gray20".to_string(),
        }
    }
}

/// Style of one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStyle {
    pub foreground: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl TagStyle {
    pub fn new(foreground: &str) -> Self {
        Self {
            foreground: foreground.to_string(),
            background: None,
        }
    }
}

/// Editor tunables (`settings.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Soft tab width in spaces
    pub tab_spaces: usize,

    /// Lines re-tagged on each side of an edit
    pub tag_line_stride: usize,

    /// Cap on concurrently running background threads
    pub max_threads: usize,

    /// Watcher tick interval in milliseconds
    pub watch_interval_ms: u64,

    /// Prefer parser-backed tagging where available
    pub tree_sitter: bool,

    /// Key binding overrides: key string -> action name
    pub bindings: HashMap<String, String>,
}

impl EditorConfig {
    /// Loads settings from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads settings if the file exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_spaces: 4,
            tag_line_stride: 128,
            max_threads: DEFAULT_MAX_THREADS,
            watch_interval_ms: 1,
            tree_sitter: false,
            bindings: HashMap::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.text.font, FontSpec("Fira Mono".to_string(), 12));
        assert_eq!(config.tag_color("keyword"), Some("magenta"));
        assert_eq!(config.tag_color("nope"), None);
    }

    #[test]
    fn test_font_serializes_as_pair() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["text"]["font"], serde_json::json!(["Fira Mono", 12]));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"text": {"foreground": "red"}}"#).unwrap();
        assert_eq!(config.text.foreground, "red");
        assert_eq!(config.text.background, "gray16");
        assert!(config.tags.is_empty() || config.tags.contains_key("keyword"));
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_editor_config_toml() {
        let config: EditorConfig = toml::from_str(
            "tab_spaces = 2\n[bindings]\n\"ctrl+g\" = \"find\"\n",
        )
        .unwrap();
        assert_eq!(config.tab_spaces, 2);
        assert_eq!(config.tag_line_stride, 128);
        assert_eq!(config.bindings.get("ctrl+g").map(String::as_str), Some("find"));
    }
}
