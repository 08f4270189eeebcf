//! `ms aliases`: shell aliases for `eval "$(ms aliases)"`.

use tracing::debug;

use crate::{context::Context, error::CliResult};

/// Print one alias per repository. Any config problem prints nothing and
/// still succeeds, so a broken workspace never breaks shell startup.
pub fn execute(ctx: &Context) -> CliResult<()> {
    let config = match ctx.workspace.load(true) {
        Ok(config) => config,
        Err(err) => {
            debug!(error = %err, "No aliases");
            return Ok(());
        }
    };
    for line in config.alias_lines() {
        ctx.output.data(&line)?;
    }
    Ok(())
}
