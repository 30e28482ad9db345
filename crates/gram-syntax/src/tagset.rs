//! Tags applied to a live buffer.
//!
//! A `TagSet` owns the spans currently shown for one buffer. Re-tagging a
//! range first clears every tag inside it, then applies the fresh spans,
//! so tagging the same text twice yields the same set.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::{SYNC_TAG, Span, TagSpans};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: BTreeMap<String, Vec<Span>>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all tags inside `range` with `fresh` (absolute offsets).
    pub fn retag(&mut self, range: Range<usize>, fresh: TagSpans) {
        self.clear_range(range);
        for (tag, spans) in fresh.iter() {
            if tag == SYNC_TAG {
                continue;
            }
            let entry = self.tags.entry(tag.to_string()).or_default();
            entry.extend(spans.iter().copied().filter(|s| !s.is_empty()));
            entry.sort_unstable();
            entry.dedup();
        }
        self.tags.retain(|_, spans| !spans.is_empty());
    }

    /// Removes tags from `range`; spans straddling its edges are cut.
    pub fn clear_range(&mut self, range: Range<usize>) {
        for spans in self.tags.values_mut() {
            let mut kept = Vec::with_capacity(spans.len());
            for span in spans.drain(..) {
                if span.end <= range.start || span.start >= range.end {
                    kept.push(span);
                    continue;
                }
                if span.start < range.start {
                    kept.push(Span::new(span.start, range.start));
                }
                if span.end > range.end {
                    kept.push(Span::new(range.end, span.end));
                }
            }
            *spans = kept;
        }
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.tags.clear();
    }

    /// Moves spans to follow an edit that replaced `removed` with
    /// `inserted` characters.
    pub fn edit(&mut self, removed: Range<usize>, inserted: usize) {
        let removed_len = removed.end - removed.start;
        let map = |offset: usize| -> usize {
            if offset <= removed.start {
                offset
            } else if offset >= removed.end {
                offset - removed_len + inserted
            } else {
                removed.start + inserted
            }
        };

        for spans in self.tags.values_mut() {
            for span in spans.iter_mut() {
                *span = Span::new(map(span.start), map(span.end));
            }
            spans.retain(|s| !s.is_empty());
        }
        self.tags.retain(|_, spans| !spans.is_empty());
    }

    pub fn get(&self, tag: &str) -> &[Span] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of the tags covering `offset`.
    pub fn tags_at(&self, offset: usize) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|(_, spans)| spans.iter().any(|s| s.contains(offset)))
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// The span of `tag` covering `offset`, if any.
    pub fn span_at(&self, tag: &str, offset: usize) -> Option<Span> {
        self.get(tag).iter().copied().find(|s| s.contains(offset))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Span])> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
