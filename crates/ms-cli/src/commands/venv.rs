//! `ms venv`: uv-managed `.venv` per repository.

use ms_core::application::VenvService;

use crate::{
    cli::VenvCommand,
    context::{Context, forward},
    error::CliResult,
};

pub fn execute(cmd: VenvCommand, ctx: &Context) -> CliResult<()> {
    let config = ctx.preflight()?;
    let repos = ctx.selected(&config)?;
    let venv = ctx.venv();

    ctx.for_each_repo(&repos, |repo, dir| {
        ctx.output
            .repo_header(&format!("--- {} ---", repo.name), repo.color)?;
        match &cmd {
            VenvCommand::Create => {
                let spinner = ctx.output.spinner(format!("Creating venv for {}", repo.name));
                let created = venv.create(dir);
                spinner.finish_and_clear();
                created?;
                ctx.output.success(&format!(
                    "Created {}",
                    VenvService::venv_path(dir).display()
                ))?;
                Ok(())
            }
            VenvCommand::Sync { requirements } => forward(venv.sync(dir, requirements)?),
        }
    })
}
