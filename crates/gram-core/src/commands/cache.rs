use tracing::{info, warn};

use crate::cache::blob_name;
use crate::command::{CommandContext, CommandHandler};
use crate::CoreResult;

/// `cache: load <name>`, `cache: save <name>` or `cache: clear`.
///
/// Names may contain spaces; they are joined with `_`.
pub struct CacheCommand;

impl CommandHandler for CacheCommand {
    fn name(&self) -> &str {
        "cache"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        let mut words = arg.split(' ');
        let op = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let name = blob_name(&args);

        match op {
            "load" => ctx.editor.load_cache(&name),
            "save" => {
                let saved = ctx.editor.save_cache(&name)?;
                info!("Saved {} files", saved);
                Ok(())
            }
            "clear" => {
                ctx.editor.show_log()?;
                ctx.editor.clear_buffers();
                Ok(())
            }
            other => {
                warn!("Unknown cache operation '{}'", other);
                Ok(())
            }
        }
    }

    fn description(&self) -> &str {
        "Load, save or clear the set of open files"
    }
}
