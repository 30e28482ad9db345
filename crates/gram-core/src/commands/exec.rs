use crate::command::{CommandContext, CommandHandler};
use crate::{CoreResult, script};

/// `exec: <script>` runs editor statements; see [`crate::script`].
pub struct ExecCommand;

impl CommandHandler for ExecCommand {
    fn name(&self) -> &str {
        "exec"
    }

    fn execute(&self, ctx: &mut CommandContext, arg: &str) -> CoreResult<()> {
        script::run(ctx.editor, arg)
    }

    fn description(&self) -> &str {
        "Run editor statements"
    }
}
