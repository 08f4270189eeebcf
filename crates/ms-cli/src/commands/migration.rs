//! `ms migration`: alembic in the workspace's `db-alembic` repository,
//! and the downgrade/upgrade steps `checkout --migrate` wraps around a
//! branch switch.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use ms_core::domain::{DomainError, MigrationPlan, MigrationSteps};
use ms_core::prelude::*;

use crate::{cli::MigrationCommand, context::Context, error::CliResult};

#[instrument(skip_all)]
pub fn execute(cmd: MigrationCommand, ctx: &Context) -> CliResult<()> {
    let config = ctx.preflight()?;
    let (repo, dir) = alembic_repo(ctx, &config)?;
    let migration = ctx.migration();

    match cmd {
        MigrationCommand::Current => {
            let spinner = ctx.output.spinner("Reading database revision");
            let revision = migration.current_revision(&dir, repo);
            spinner.finish_and_clear();
            ctx.output.data(&format!("Current DB revision: {}", revision?))?;
        }
        MigrationCommand::Plan { target } => {
            let plan = plan(ctx, repo, &dir, &target)?;
            print_plan(ctx, repo, &target, &plan)?;
        }
        MigrationCommand::Migrate { target } => {
            let plan = plan(ctx, repo, &dir, &target)?;
            print_plan(ctx, repo, &target, &plan)?;
            match &plan {
                MigrationPlan::Steps(steps) if steps.downgrade_target().is_some() => {
                    downgrade(ctx, repo, &dir, steps)?;
                    ctx.output.info(&format!(
                        "Now switch to '{target}' and run 'ms migration upgrade'."
                    ))?;
                }
                _ => ctx.output.info("No downgrade needed.")?,
            }
        }
        MigrationCommand::Upgrade => upgrade(ctx, repo, &dir)?,
    }
    Ok(())
}

/// The single `db-alembic` repository and its directory.
pub fn alembic_repo<'a>(
    ctx: &Context,
    config: &'a WorkspaceConfig,
) -> CliResult<(&'a RepoConfig, PathBuf)> {
    let repo = config
        .alembic_repo()
        .ok_or(MsError::Domain(DomainError::NoAlembicRepo))?;
    Ok((repo, ctx.repo_dir(repo)))
}

/// Plan the move from the repo's checked-out branch to `target`.
pub fn plan(
    ctx: &Context,
    repo: &RepoConfig,
    dir: &Path,
    target: &str,
) -> CliResult<MigrationPlan> {
    let current = ctx.git().current_branch(dir);
    let spinner = ctx.output.spinner(format!("Planning migrations {current} -> {target}"));
    let plan = ctx.migration().plan(dir, repo, &current, target);
    spinner.finish_and_clear();
    Ok(plan?)
}

pub fn print_plan(
    ctx: &Context,
    repo: &RepoConfig,
    target: &str,
    plan: &MigrationPlan,
) -> CliResult<()> {
    ctx.output.repo_header(
        &format!("--- {} migrations for '{target}' ---", repo.name),
        repo.color,
    )?;
    match plan {
        MigrationPlan::NotNeeded => ctx.output.print("No migrations in either branch.")?,
        MigrationPlan::Steps(steps) => {
            for line in steps.to_string().lines() {
                ctx.output.print(line)?;
            }
        }
        // `plan` turns this into an error before it reaches the caller.
        MigrationPlan::Unreachable { revision } => {
            ctx.output.warning(&format!("Revision {revision} is unreachable"))?;
        }
    }
    Ok(())
}

/// Confirm, then downgrade to the revision shared with the target branch.
pub fn downgrade(
    ctx: &Context,
    repo: &RepoConfig,
    dir: &Path,
    steps: &MigrationSteps,
) -> CliResult<()> {
    let Some(revision) = steps.downgrade_target() else {
        return Ok(());
    };
    ctx.confirm_destructive(&format!(
        "Downgrading {} to {revision} may drop tables or columns.",
        repo.name
    ))?;
    ctx.output.info(&format!("Downgrading to revision: {revision}"))?;
    let spinner = ctx.output.spinner("alembic downgrade");
    let result = ctx.migration().downgrade(dir, repo, revision);
    spinner.finish_and_clear();
    result?;
    info!(revision, "Downgraded");
    ctx.output.success(&format!("Downgraded {} to {revision}", repo.name))?;
    Ok(())
}

pub fn upgrade(ctx: &Context, repo: &RepoConfig, dir: &Path) -> CliResult<()> {
    ctx.output.info("Upgrading to head")?;
    let spinner = ctx.output.spinner("alembic upgrade head");
    let result = ctx.migration().upgrade(dir, repo);
    spinner.finish_and_clear();
    result?;
    ctx.output.success(&format!("Upgraded {} to head", repo.name))?;
    Ok(())
}
