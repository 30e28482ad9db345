//! Following links under the cursor.
//!
//! The links tagger marks `scheme://...` runs. Web links are handed to
//! the front-end; anything else is read as `<path>[:line[:col]]` with a
//! 1-based line and 0-based column, the format find-all writes.

use gram_buffer::Position;
use gram_syntax::LINK_TAG;
use std::path::Path;
use tracing::{debug, info};

use crate::complete::shorten_paths;
use crate::editor::Editor;
use crate::event::EditorEvent;
use crate::CoreResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Web(String),
    File {
        path: String,
        /// 1-based; 0 when absent
        line: usize,
        column: usize,
    },
}

impl Link {
    pub fn parse(link: &str) -> Option<Self> {
        let link = link.trim();
        let (scheme, rest) = link.split_once("://")?;
        if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
            return Some(Link::Web(link.to_string()));
        }

        let (dir, base) = match rest.rsplit_once('/') {
            Some((dir, base)) => (Some(dir), base),
            None => (None, rest),
        };
        let mut parts = base.split(':');
        let name = parts.next().unwrap_or_default();
        let line = parts.next().and_then(|l| l.trim().parse().ok()).unwrap_or(0);
        let column = parts.next().and_then(|c| c.trim().parse().ok()).unwrap_or(0);

        let path = match dir {
            Some(dir) => format!("{}/{}", dir, name),
            None => name.to_string(),
        };
        if path.is_empty() {
            return None;
        }
        Some(Link::File { path, line, column })
    }
}

/// Follows the link under the active buffer's cursor.
pub fn follow(editor: &mut Editor) -> CoreResult<()> {
    let text = editor.with_view(|view| {
        let head = view.cursor.head;
        let span = view
            .tags
            .get(LINK_TAG)
            .iter()
            .copied()
            .find(|s| s.start <= head && head <= s.end)?;
        view.text.slice(span.start..span.end).ok().map(|s| s.into_owned())
    })?;

    let Some(text) = text else {
        debug!("No link under the cursor");
        return Ok(());
    };

    match Link::parse(&text) {
        Some(Link::Web(url)) => {
            info!("open url: {}", url);
            editor.emit(EditorEvent::OpenUrl(url));
            Ok(())
        }
        Some(Link::File { path, line, column }) => {
            let position = Position::new(line.saturating_sub(1), column);
            open_target(editor, &path, position)
        }
        None => {
            debug!("Unreadable link '{}'", text);
            Ok(())
        }
    }
}

/// Opens `path` at `position`, preferring an open buffer whose shortened
/// path ends with it.
fn open_target(editor: &mut Editor, path: &str, position: Position) -> CoreResult<()> {
    let open = editor.store.paths();
    let shortened = shorten_paths(&open);
    let known = open
        .into_iter()
        .zip(shortened)
        .find(|(_, short)| short.ends_with(path))
        .map(|(full, _)| full);

    match known {
        Some(full) => editor.open_file(&full, false, Some(position)),
        None if Path::new(path).exists() => editor.open_file(Path::new(path), false, Some(position)),
        None => {
            info!("Link target not found: {}", path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::key::slashed;
    use std::fs;

    #[test]
    fn test_parse() {
        assert_eq!(
            Link::parse("https://example.com/x"),
            Some(Link::Web("https://example.com/x".into()))
        );
        assert_eq!(
            Link::parse("file:///tmp/a.txt:3:4"),
            Some(Link::File {
                path: "/tmp/a.txt".into(),
                line: 3,
                column: 4
            })
        );
        assert_eq!(
            Link::parse("file://notes.md:12"),
            Some(Link::File {
                path: "notes.md".into(),
                line: 12,
                column: 0
            })
        );
        assert_eq!(Link::parse("no scheme"), None);
    }

    #[test]
    fn test_follow_file_link() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        let mut editor = Editor::new(session).unwrap();

        let target = dir.path().join("target.txt");
        fs::write(&target, "first\nsecond line\n").unwrap();
        let source = dir.path().join("source.txt");
        fs::write(&source, format!("see file://{}:2:3 here", slashed(&target))).unwrap();
        editor.open_file(&source, false, None).unwrap();

        editor.with_view(|view| view.cursor.move_to(8)).unwrap();
        editor.follow_link().unwrap();

        assert_eq!(editor.active_path(), Some(target));
        // line 2, column 3
        assert_eq!(editor.cursor(), Some(6 + 3));
    }

    #[test]
    fn test_follow_web_link() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data"))).unwrap();
        let mut editor = Editor::new(session).unwrap();
        let source = dir.path().join("source.txt");
        fs::write(&source, "https://example.com/page").unwrap();
        editor.open_file(&source, false, None).unwrap();

        let mut events = crate::EventHandler::new(editor.subscribe());
        editor.with_view(|view| view.cursor.move_to(3)).unwrap();
        editor.follow_link().unwrap();

        assert!(events.drain().iter().any(
            |e| matches!(e, EditorEvent::OpenUrl(url) if url == "https://example.com/page")
        ));
    }
}
