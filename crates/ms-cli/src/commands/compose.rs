//! `ms compose`: docker compose in every selected repository.

use tracing::{info, instrument};

use ms_core::application::ComposeAction;

use crate::{
    cli::ComposeCommand,
    context::{Context, forward},
    error::CliResult,
};

#[instrument(skip_all)]
pub fn execute(cmd: ComposeCommand, ctx: &Context) -> CliResult<()> {
    let action = action(cmd);
    let compose = ctx.compose();
    compose.ensure_available()?;

    let config = ctx.preflight()?;
    let repos = ctx.selected(&config)?;
    if action.is_destructive() {
        ctx.confirm_destructive(&format!(
            "docker compose {action} removes named volumes and their data."
        ))?;
    }

    ctx.for_each_repo(&repos, |repo, dir| {
        if compose.compose_file(dir).is_none() {
            info!(repo = %repo.name, "No compose file");
            ctx.output
                .warning(&format!("No docker-compose.yml found in {}", dir.display()))?;
            return Ok(());
        }
        ctx.output
            .repo_header(&format!("--- {} [{action}] ---", repo.name), repo.color)?;
        forward(compose.run(dir, action)?)
    })
}

const fn action(cmd: ComposeCommand) -> ComposeAction {
    match cmd {
        ComposeCommand::Up { detach, build } => ComposeAction::Up { detach, build },
        ComposeCommand::Down { volumes } => ComposeAction::Down { volumes },
        ComposeCommand::Build => ComposeAction::Build,
    }
}
