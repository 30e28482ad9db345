//! Ordered regex alternation tagging.
//!
//! Each definition contributes one fragment containing a capture group
//! named after its tag. Fragments are joined, in order, into one pattern;
//! the regex engine's leftmost-first semantics make earlier fragments win
//! when several could match at the same position.
//!
//! A group name may carry a `__suffix` so that one fragment can emit a
//! second group for the same tag (`keyword__class` tags as `keyword`).

use regex::Regex;
use tracing::debug;

use crate::{CharIndex, SYNC_TAG, Span, SyntaxError, SyntaxResult, TagSpans, Tagger};

/// Separates a tag name from an alias suffix in a group name.
const ALIAS_SEPARATOR: &str = "__";

/// One `(tag name, pattern fragment)` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef {
    pub name: String,
    pub fragment: String,
}

impl TagDef {
    pub fn new(name: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragment: fragment.into(),
        }
    }
}

/// A tagger backed by a single compiled alternation.
#[derive(Debug, Clone)]
pub struct RegexTagger {
    name: String,
    regex: Regex,
    /// Capture group index -> tag name, in group order.
    groups: Vec<(usize, String)>,
}

impl RegexTagger {
    /// Compiles ordered definitions into a tagger.
    ///
    /// Each fragment is validated on its own first, so a bad fragment is
    /// reported under its tag name.
    pub fn compile(name: &str, defs: &[TagDef]) -> SyntaxResult<Self> {
        for def in defs {
            Regex::new(&def.fragment).map_err(|source| SyntaxError::Pattern {
                tag: def.name.clone(),
                source,
            })?;
            if !def.fragment.contains(&format!("(?P<{}>", def.name)) {
                return Err(SyntaxError::MissingGroup(def.name.clone()));
            }
        }

        let alternation = defs
            .iter()
            .map(|def| format!("(?:{})", def.fragment))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!("(?ms){alternation}");

        let regex = Regex::new(&pattern).map_err(|source| SyntaxError::Pattern {
            tag: name.to_string(),
            source,
        })?;

        let groups = regex
            .capture_names()
            .enumerate()
            .filter_map(|(idx, group)| {
                let group = group?;
                let tag = group.split(ALIAS_SEPARATOR).next().unwrap_or(group);
                Some((idx, tag.to_string()))
            })
            .collect::<Vec<_>>();

        debug!("Compiled tagger {} with {} groups", name, groups.len());

        Ok(Self {
            name: name.to_string(),
            regex,
            groups,
        })
    }
}

impl Tagger for RegexTagger {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, text: &str) -> TagSpans {
        let index = CharIndex::new(text);
        let mut spans = TagSpans::new();

        for caps in self.regex.captures_iter(text) {
            for (idx, tag) in &self.groups {
                if tag == SYNC_TAG {
                    continue;
                }
                if let Some(m) = caps.get(*idx) {
                    let span: Span = index.span(m.range());
                    spans.push(tag, span);
                }
            }
        }

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger(defs: &[(&str, &str)]) -> RegexTagger {
        let defs: Vec<TagDef> = defs.iter().map(|(n, f)| TagDef::new(*n, *f)).collect();
        RegexTagger::compile("test", &defs).unwrap()
    }

    #[test]
    fn test_earlier_fragment_wins() {
        let t = tagger(&[
            ("keyword", r"\b(?P<keyword>if)\b"),
            ("ident", r"\b(?P<ident>\w+)\b"),
        ]);
        let spans = t.apply("if x");
        assert_eq!(spans.get("keyword"), &[Span::new(0, 2)]);
        assert_eq!(spans.get("ident"), &[Span::new(3, 4)]);
    }

    #[test]
    fn test_alias_groups_share_tag() {
        let t = tagger(&[(
            "classdef",
            r"\b(?P<keyword__class>class)[ \t]+(?P<classdef>\w+)",
        )]);
        let spans = t.apply("class Foo");
        assert_eq!(spans.get("keyword"), &[Span::new(0, 5)]);
        assert_eq!(spans.get("classdef"), &[Span::new(6, 9)]);
    }

    #[test]
    fn test_sync_anchor_not_reported() {
        let t = tagger(&[("sync", r"(?P<sync>\n)"), ("number", r"\b(?P<number>\d+)\b")]);
        let spans = t.apply("1\n2\n");
        assert!(spans.get("sync").is_empty());
        assert_eq!(spans.get("number").len(), 2);
    }

    #[test]
    fn test_invalid_fragment_names_tag() {
        let defs = vec![TagDef::new("broken", r"(?P<broken>[a-")];
        match RegexTagger::compile("test", &defs) {
            Err(SyntaxError::Pattern { tag, .. }) => assert_eq!(tag, "broken"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fragment_without_group_rejected() {
        let defs = vec![TagDef::new("number", r"\d+")];
        assert!(matches!(
            RegexTagger::compile("test", &defs),
            Err(SyntaxError::MissingGroup(_))
        ));
    }

    #[test]
    fn test_offsets_are_chars() {
        let t = tagger(&[("number", r"\b(?P<number>\d+)\b")]);
        let spans = t.apply("é 42");
        assert_eq!(spans.get("number"), &[Span::new(2, 4)]);
    }
}
