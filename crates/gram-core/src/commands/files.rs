use std::path::PathBuf;
use tracing::info;

use crate::command::{CommandContext, CommandHandler};
use crate::complete::has_wildcard;
use crate::key::resolve;
use crate::CoreResult;

/// `open: <path or glob>`. Shift opens in a new instance.
///
/// A glob opens everything the palette currently lists for it: one file
/// directly, several in the background.
pub struct OpenCommand;

impl CommandHandler for OpenCommand {
    fn name(&self) -> &str {
        "open"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        let editor = &mut *ctx.editor;
        if !has_wildcard(arg) {
            let path = resolve(editor.session().workdir(), arg);
            if ctx.shift {
                editor.spawn_instance(&path);
                return Ok(());
            }
            return editor.open_file(&path, false, None);
        }

        let matches = editor.completions();
        let message = format!("opening {} files matching: {}", matches.len(), arg);
        let rule = "-".repeat(message.chars().count());
        info!("{}", rule);
        info!("{}", message);
        info!("{}", rule);
        editor.show_log()?;

        let workdir = editor.session().workdir().to_path_buf();
        let mut paths: Vec<PathBuf> = matches.iter().map(|m| resolve(&workdir, m)).collect();
        match paths.len() {
            0 => Ok(()),
            1 => {
                let path = paths.remove(0);
                if ctx.shift {
                    editor.spawn_instance(&path);
                    Ok(())
                } else {
                    editor.open_file(&path, false, None)
                }
            }
            _ => {
                editor.open_many(paths);
                Ok(())
            }
        }
    }

    fn description(&self) -> &str {
        "Open a file, or every file matching a glob"
    }
}

/// `tab: <fragment>` switches to an open buffer, then leaves the palette
/// ready for the next switch.
pub struct TabCommand;

impl CommandHandler for TabCommand {
    fn name(&self) -> &str {
        "tab"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        ctx.editor.switch_tab(arg, ctx.shift)?;
        ctx.editor.palette_set_text("tab: ");
        Ok(())
    }

    fn description(&self) -> &str {
        "Switch to an open buffer"
    }
}

/// `save as: <path>` writes the active text to a new path and shows it.
pub struct SaveAsCommand;

impl CommandHandler for SaveAsCommand {
    fn name(&self) -> &str {
        "save as"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        ctx.editor.save_as(arg)
    }

    fn description(&self) -> &str {
        "Save the active buffer under a new name"
    }
}
