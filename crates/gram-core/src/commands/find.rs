use crate::command::{CommandContext, CommandHandler};
use crate::{CoreResult, search};

/// `find: <text>`. Shift searches backwards.
pub struct FindCommand;

impl CommandHandler for FindCommand {
    fn name(&self) -> &str {
        "find"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        search::find(ctx.editor, arg, ctx.shift).map(|_| ())
    }

    fn description(&self) -> &str {
        "Find text in the active buffer"
    }
}

/// `find all: <text>` searches every open buffer.
pub struct FindAllCommand;

impl CommandHandler for FindAllCommand {
    fn name(&self) -> &str {
        "find all"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        search::find_all(ctx.editor, arg)
    }

    fn description(&self) -> &str {
        "Find text in all open buffers"
    }
}
