//! Command handlers. Each module owns one top-level subcommand.

pub mod aliases;
pub mod complete;
pub mod completions;
pub mod compose;
pub mod config;
pub mod env;
pub mod git;
pub mod migration;
pub mod prompt;
pub mod setup;
pub mod shell;
pub mod tf;
pub mod venv;

use crate::{cli::RepoCommand, context::Context, error::CliResult};

/// `ms repo <alias> <command>`: the fan-out handlers, narrowed to one repo.
pub fn repo(alias: String, command: RepoCommand, ctx: &mut Context) -> CliResult<()> {
    ctx.global.repos = vec![alias];
    match command {
        RepoCommand::Git(cmd) => git::execute(cmd, ctx),
        RepoCommand::Env(cmd) => env::execute(cmd, ctx),
        RepoCommand::Compose(cmd) => compose::execute(cmd, ctx),
        RepoCommand::Venv(cmd) => venv::execute(cmd, ctx),
    }
}
