//! Polling file watcher.
//!
//! The front-end calls [`tick`] on a short timer from the GUI thread.
//! Each tick looks at the active buffer and the appearance config only:
//!
//! 1. A buffer marked modified whose text is back at its save point is
//!    marked unmodified.
//! 2. If the file's disk mtime differs from the recorded one, an
//!    unmodified buffer reloads from disk, keeping its cursor. A modified
//!    buffer is flagged as externally modified instead, once, with a bell.
//! 3. A changed `config.json` is re-applied; one that fails to parse
//!    leaves the current appearance in place.

use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::editor::Editor;
use crate::event::EditorEvent;
use crate::key::BufferKey;

/// Runs one watcher pass.
pub fn tick(editor: &mut Editor) {
    if let Some(key) = editor.active.clone() {
        check_buffer(editor, &key);
    }
    check_config(editor);
}

fn check_buffer(editor: &mut Editor, key: &BufferKey) {
    let Some((path, recorded, modified, flagged)) = editor.store.with_mut(key, |buffer| {
        let back_at_save = buffer.view().is_some_and(|v| !v.text.is_modified());
        if buffer.modified && back_at_save {
            buffer.modified = false;
        }
        (
            buffer.path.clone(),
            buffer.mtime,
            buffer.modified,
            buffer.externally_modified,
        )
    }) else {
        return;
    };

    if !path.is_file() {
        editor.refresh_title();
        return;
    }
    let on_disk = match std::fs::metadata(&path).and_then(|m| m.modified()) {
        Ok(mtime) => mtime,
        Err(e) => {
            debug!("stat file://{}: {}", path.display(), e);
            return;
        }
    };
    if recorded == Some(on_disk) {
        return;
    }

    if !modified {
        reload(editor, key);
    } else if !flagged {
        warn!("External edits to file://{}", path.display());
        editor.store.with_mut(key, |buffer| buffer.externally_modified = true);
        editor.emit(EditorEvent::Bell);
        editor.refresh_title();
    }
}

/// Re-reads an unmodified buffer from disk and re-tags what is visible.
/// Buffers with local edits are left alone.
pub(crate) fn reload(editor: &mut Editor, key: &BufferKey) {
    let Some((path, modified)) = editor.store.with(key, |b| (b.path.clone(), b.modified)) else {
        return;
    };
    if modified {
        debug!("Not reloading modified file://{}", path.display());
        return;
    }

    let (text, mtime) = match read_with_mtime(&path) {
        Ok(read) => read,
        Err(e) => {
            warn!("reload file://{}: {}", path.display(), e);
            return;
        }
    };

    let visible = editor.visible.clone();
    let retagged = editor.store.with_mut(key, |buffer| {
        buffer.set_lines(crate::buffer::split_lines(&text));
        buffer.mtime = Some(mtime);
        buffer.modified = false;
        buffer.externally_modified = false;
        buffer.view_mut().map(|view| {
            view.reload(&text);
            view.retag_lines(visible)
        })
    });

    debug!("Reloaded file://{}", path.display());
    if let Some(Some(range)) = retagged {
        editor.emit(EditorEvent::TagsChanged {
            key: key.clone(),
            range,
        });
    }
    if editor.active.as_ref() == Some(key) {
        editor.refresh_title();
    }
}

fn read_with_mtime(path: &std::path::Path) -> std::io::Result<(String, SystemTime)> {
    let mtime = std::fs::metadata(path)?.modified()?;
    let text = std::fs::read_to_string(path)?;
    Ok((text, mtime))
}

fn check_config(editor: &mut Editor) {
    let path = editor.session.config_path();
    let Ok(mtime) = std::fs::metadata(&path).and_then(|m| m.modified()) else {
        return;
    };
    if editor.config_mtime == Some(mtime) {
        return;
    }
    info!("Config changed on disk");
    editor.config_mtime = Some(mtime);
    editor.reload_config();
}
