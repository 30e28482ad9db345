//! # Gram Syntax
//!
//! Syntax highlighting as *tagging*: a [`Tagger`] turns a piece of text
//! into named span lists (`tag name -> spans`). The editor decides which
//! range of a buffer to re-tag and keeps the applied result in a
//! [`TagSet`].
//!
//! ## Taggers
//!
//! - [`RegexTagger`]: compiles ordered `(name, fragment)` definitions into
//!   a single alternation. Earlier fragments win when two could start at
//!   the same position.
//! - `TreeSitterTagger` (feature `tree-sitter`): walks a parse tree and
//!   maps node kinds to tag names. The rest of the editor never depends on
//!   it being present.

mod grammar;
mod regex_tagger;
mod tagset;
#[cfg(feature = "tree-sitter")]
mod parsed;

use std::collections::BTreeMap;

pub use grammar::{
    LanguageRegistry, generic_grammar, link_grammar, markup_grammar, python_grammar,
};
pub use regex_tagger::{RegexTagger, TagDef};
pub use tagset::TagSet;
#[cfg(feature = "tree-sitter")]
pub use parsed::TreeSitterTagger;

/// Tag used only to give the pattern a per-line anchor; never rendered.
pub const SYNC_TAG: &str = "sync";

/// Tag carrying navigable `scheme://` links.
pub const LINK_TAG: &str = "links";

/// Result type for syntax operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors that can occur while building taggers.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Parser error")]
    ParseError,

    #[error("Invalid pattern for tag '{tag}': {source}")]
    Pattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    #[error("Tag fragment '{0}' has no capture group named after it")]
    MissingGroup(String),
}

/// A half-open character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Moves the span by `delta` characters.
    pub fn offset(self, delta: usize) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }
}

/// Spans produced by one tagging pass, keyed by tag name.
///
/// Spans are kept per tag, so two tags may cover the same characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSpans {
    tags: BTreeMap<String, Vec<Span>>,
}

impl TagSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: &str, span: Span) {
        if span.is_empty() {
            return;
        }
        match self.tags.get_mut(tag) {
            Some(spans) => spans.push(span),
            None => {
                self.tags.insert(tag.to_string(), vec![span]);
            }
        }
    }

    pub fn get(&self, tag: &str) -> &[Span] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Span])> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.values().all(Vec::is_empty)
    }

    /// Adds every span of `other`.
    pub fn merge(&mut self, other: TagSpans) {
        for (tag, spans) in other.tags {
            self.tags.entry(tag).or_default().extend(spans);
        }
    }

    /// Shifts all spans by `delta` characters.
    pub fn offset(self, delta: usize) -> Self {
        let tags = self
            .tags
            .into_iter()
            .map(|(tag, spans)| (tag, spans.into_iter().map(|s| s.offset(delta)).collect()))
            .collect();
        Self { tags }
    }
}

/// Turns text into tag spans. Implementations are pure and stateless.
pub trait Tagger: Send + Sync {
    /// Short identifier, used in logs.
    fn name(&self) -> &str;

    /// Tags `text`; span offsets are characters relative to its start.
    fn apply(&self, text: &str) -> TagSpans;
}

/// Maps byte offsets of a string to character offsets.
pub(crate) struct CharIndex {
    /// Byte offset of every char; empty for ASCII text.
    starts: Vec<usize>,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let starts = if text.is_ascii() {
            Vec::new()
        } else {
            text.char_indices().map(|(b, _)| b).collect()
        };
        Self { starts }
    }

    pub(crate) fn char_of(&self, byte: usize) -> usize {
        if self.starts.is_empty() {
            byte
        } else {
            self.starts.partition_point(|&b| b < byte)
        }
    }

    pub(crate) fn span(&self, bytes: std::ops::Range<usize>) -> Span {
        Span::new(self.char_of(bytes.start), self.char_of(bytes.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_index_multibyte() {
        let text = "é = \"x\"";
        let index = CharIndex::new(text);
        // 'é' is two bytes
        assert_eq!(index.char_of(2), 1);
        assert_eq!(index.char_of(text.len()), text.chars().count());
    }

    #[test]
    fn test_tag_spans_skip_empty() {
        let mut spans = TagSpans::new();
        spans.push("string", Span::new(3, 3));
        assert!(spans.is_empty());
        spans.push("string", Span::new(3, 5));
        assert_eq!(spans.get("string"), &[Span::new(3, 5)]);
    }
}
