//! Find in the active buffer and across every open buffer.
//!
//! Both searches are case-insensitive and literal. Find-all writes its
//! results to the session's `find_all.log` as clickable
//! `file://<path>:<line>:<col>: <text>` lines while workers run.

use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info};

use gram_buffer::search::match_columns;

use crate::editor::Editor;
use crate::key::{BufferKey, slashed};
use crate::{CoreError, CoreResult, watcher};

/// Selects the next match of `text` after the cursor, or with `backward`
/// the previous one before the selection, wrapping around the buffer.
/// Returns false if there is no match at all.
pub fn find(editor: &mut Editor, text: &str, backward: bool) -> CoreResult<bool> {
    let len = text.chars().count();
    if len == 0 {
        return Ok(false);
    }

    let found = editor.with_view(|view| {
        let head = view.cursor.head;
        let hit = if backward {
            head.checked_sub(len + 1)
                .and_then(|from| view.text.find_prev(text, from))
                .or_else(|| view.text.find_prev(text, view.text.len_chars()))
        } else {
            view.text
                .find_next(text, head)
                .or_else(|| view.text.find_next(text, 0))
        };
        if let Some(start) = hit {
            view.cursor.select(start..start + len);
        }
        hit
    })?;

    match found {
        Some(start) => debug!("find '{}' at {}", text, start),
        None => info!("find: no match for '{}'", text),
    }
    Ok(found.is_some())
}

/// Searches every open buffer for `text` in the background and shows the
/// results log.
pub fn find_all(editor: &mut Editor, text: &str) -> CoreResult<()> {
    let log_path = editor.session.find_all_path();
    let mut log = File::create(&log_path).map_err(|e| CoreError::file(&log_path, e))?;

    let header = format!(
        "find all results matching: {}\nin {} files",
        text,
        editor.store.len()
    );
    writeln!(log, "{}\n{}", header, "-".repeat(header.chars().count()))
        .map_err(|e| CoreError::file(&log_path, e))?;

    editor.open_file(&log_path, true, None)?;
    let log_key = BufferKey::new(&log_path);
    let sources = editor.store.contents(&log_key);

    let needle = text.to_string();
    let scheduler = editor.scheduler.clone();
    let gui = editor.gui.sender();
    let log = Mutex::new(log);

    editor.scheduler.spawn("find_all", move || {
        let started = Instant::now();
        scheduler.run("find_worker", &sources, |chunk| {
            for (path, contents) in chunk {
                let path = slashed(path);
                contents.for_each_line(|idx, line| {
                    for column in match_columns(line, &needle) {
                        let written = writeln!(
                            log.lock(),
                            "file://{}:{}:{}: {}",
                            path,
                            idx + 1,
                            column,
                            line.trim()
                        );
                        if let Err(e) = written {
                            error!("find all: {}", e);
                        }
                    }
                });
            }
        });

        let elapsed = started.elapsed().as_secs_f64();
        if let Err(e) = writeln!(log.lock(), "\ndone. {:.3} secs", elapsed) {
            error!("find all: {}", e);
        }
        gui.post(move |editor| watcher::reload(editor, &log_key));
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use std::fs;
    use std::time::Duration;

    fn editor_with(contents: &str) -> (tempfile::TempDir, Editor) {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Some(dir.path().join("data")))
            .unwrap()
            .with_workdir(dir.path());
        let mut editor = Editor::new(session).unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, contents).unwrap();
        editor.open_file(&path, false, None).unwrap();
        (dir, editor)
    }

    #[test]
    fn test_find_forward_wraps() {
        let (_dir, mut editor) = editor_with("Foo bar foo");
        assert!(find(&mut editor, "foo", false).unwrap());
        assert_eq!(editor.cursor(), Some(3));
        assert!(find(&mut editor, "foo", false).unwrap());
        assert_eq!(editor.cursor(), Some(11));
        assert!(find(&mut editor, "foo", false).unwrap());
        assert_eq!(editor.cursor(), Some(3));
        assert!(!find(&mut editor, "zzz", false).unwrap());
    }

    #[test]
    fn test_find_backward() {
        let (_dir, mut editor) = editor_with("foo bar foo");
        find(&mut editor, "foo", false).unwrap();
        find(&mut editor, "foo", false).unwrap();
        assert_eq!(editor.cursor(), Some(11));

        assert!(find(&mut editor, "foo", true).unwrap());
        assert_eq!(editor.cursor(), Some(3));
        assert!(find(&mut editor, "foo", true).unwrap());
        assert_eq!(editor.cursor(), Some(11));
    }

    #[test]
    fn test_find_all_writes_results() {
        let (dir, mut editor) = editor_with("one\nTwo two\n");
        let other = dir.path().join("b.txt");
        fs::write(&other, "nothing\ntwo\n").unwrap();
        editor.open_file(&other, false, None).unwrap();

        find_all(&mut editor, "two").unwrap();
        let log_path = editor.session().find_all_path();

        let mut text = String::new();
        for _ in 0..500 {
            text = fs::read_to_string(&log_path).unwrap();
            if text.contains("done.") {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(text.starts_with("find all results matching: two\nin 2 files\n---"));
        let a = slashed(&dir.path().join("a.txt"));
        let b = slashed(&other);
        assert!(text.contains(&format!("file://{}:2:0: Two two", a)));
        assert!(text.contains(&format!("file://{}:2:4: Two two", a)));
        assert!(text.contains(&format!("file://{}:2:0: two", b)));
        assert_eq!(text.matches("file://").count(), 3);
    }
}
