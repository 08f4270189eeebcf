//! `ms complete` helpers, called from shell completion functions.
//!
//! These never fail: a missing repo or a git error just yields no
//! candidates.

use std::path::PathBuf;

use tracing::debug;

use crate::{cli::CompleteCommand, context::Context, error::CliResult};

pub fn execute(cmd: CompleteCommand, ctx: &Context) -> CliResult<()> {
    let dir = target_dir(ctx);
    let git = ctx.git();
    let candidates = match cmd {
        CompleteCommand::Branches { remote, prefix } => git.complete_branches(&dir, &prefix, remote),
        CompleteCommand::ChangedFiles => git.changed_files(&dir),
    };
    for candidate in candidates {
        ctx.output.data(&candidate)?;
    }
    Ok(())
}

/// The first `-r` repository when a workspace config exists, else the
/// current directory.
fn target_dir(ctx: &Context) -> PathBuf {
    let Some(selector) = ctx.global.repos.first() else {
        return ctx.root().to_path_buf();
    };
    match ctx.workspace.load(true) {
        Ok(config) => match config.find_repo(selector) {
            Some(repo) => ctx.repo_dir(repo),
            None => {
                debug!(selector, "Unknown repo, completing in cwd");
                ctx.root().to_path_buf()
            }
        },
        Err(_) => ctx.root().to_path_buf(),
    }
}
