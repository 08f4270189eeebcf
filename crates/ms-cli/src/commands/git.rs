//! Fan-out git commands.
//!
//! Every handler runs against the repositories picked by `-r/--repo` (all
//! of them by default). A repository that fails is reported and the loop
//! moves on; the command exits 1 afterwards.

use std::path::Path;

use tracing::{debug, info, instrument};

use ms_core::application::{ApplicationError, NewPullRequest, PrCreated};
use ms_core::domain::{MigrationPlan, MigrationSteps, git::github_web_url};
use ms_core::prelude::*;

use crate::{
    cli::{CheckoutArgs, GitCommand, PrCommand, PrCreateArgs},
    commands::migration,
    context::{Context, forward},
    error::{CliError, CliResult},
};

#[instrument(skip_all)]
pub fn execute(cmd: GitCommand, ctx: &Context) -> CliResult<()> {
    let config = ctx.preflight()?;
    let repos = ctx.selected(&config)?;
    let git = ctx.git();
    let header = |repo: &RepoConfig| {
        ctx.output
            .repo_header(&format!("--- {} ---", repo.name), repo.color)
    };

    match cmd {
        GitCommand::Status => ctx.for_each_repo(&repos, |repo, dir| {
            let status = git.status(dir)?;
            ctx.output.repo_header(
                &format!("--- [{}] {} ---", status.branch, repo.name),
                repo.color,
            )?;
            if let Some(tracking) = &status.tracking {
                ctx.output.highlight(&format!("  {tracking}"))?;
            }
            for line in &status.changes {
                ctx.output.print(line)?;
            }
            ctx.output.print("")?;
            Ok(())
        }),

        GitCommand::Fetch => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.fetch(dir)?)
        }),

        GitCommand::Pull => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.pull(dir)?)
        }),

        GitCommand::Checkout(args) => checkout(ctx, &config, &repos, args),

        GitCommand::Branch(args) => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            let out = git.create_branch(dir, &args.name)?;
            if !out.success() {
                return Err(failed(&format!("git checkout -b {}", args.name), &out));
            }
            ctx.output
                .success(&format!("Created and switched to branch '{}'", args.name))?;
            if args.push {
                forward(git.push_upstream(dir, &args.name)?)?;
            }
            Ok(())
        }),

        GitCommand::Branches => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.branches(dir)?)
        }),

        GitCommand::Add => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            let staged = git.add_all(dir)?;
            if staged.is_empty() {
                ctx.output.print("No changes to stage.")?;
            } else {
                ctx.output.print("Staged files:")?;
                for line in &staged {
                    ctx.output.print(&format!("  {line}"))?;
                }
            }
            Ok(())
        }),

        GitCommand::Commit(args) => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.commit(dir, &args.message)?)
        }),

        GitCommand::Push(args) => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            let plan = git.plan_push(dir, args.force, &ctx.config.git.default_branch)?;
            if plan.set_upstream {
                ctx.output
                    .info("No upstream branch. Pushing and setting upstream...")?;
            }
            forward(git.push(&plan)?)
        }),

        GitCommand::Prune(args) => {
            if !args.force {
                ctx.output.warning("Operation requires --force")?;
                return Ok(());
            }
            ctx.for_each_repo(&repos, |repo, dir| {
                header(repo)?;
                prune(ctx, &git, dir)
            })
        }

        GitCommand::Reset(args) => {
            ctx.confirm_destructive(&format!(
                "Hard reset to {}/{} discards local commits and changes.",
                git.remote(),
                args.branch
            ))?;
            ctx.for_each_repo(&repos, |repo, dir| {
                header(repo)?;
                for line in git.reset_hard(dir, &args.branch)?.lines() {
                    ctx.output.print(&line)?;
                }
                Ok(())
            })
        }

        GitCommand::Diff(args) => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.diff(dir, &args.args)?)
        }),

        GitCommand::Git(args) => ctx.for_each_repo(&repos, |repo, dir| {
            header(repo)?;
            forward(git.passthrough(dir, &args.args)?)
        }),

        GitCommand::Pr(cmd) => pr(ctx, &repos, cmd),
    }
}

fn failed(command: &str, out: &CommandOutput) -> CliError {
    MsError::from(ApplicationError::command_failed(command, out.status, &out.stderr)).into()
}

// ── checkout ──────────────────────────────────────────────────────────────────

fn checkout(
    ctx: &Context,
    config: &WorkspaceConfig,
    repos: &[&RepoConfig],
    args: CheckoutArgs,
) -> CliResult<()> {
    let git = ctx.git();

    // Downgrade while the db repo still has the current branch's files.
    let steps = if args.migrate {
        migrate_before_checkout(ctx, config, &args.branch)?
    } else {
        None
    };

    let result = ctx.for_each_repo(repos, |repo, dir| {
        ctx.output
            .repo_header(&format!("--- {} ---", repo.name), repo.color)?;
        let out = git.checkout(dir, &args.branch)?;
        if out.success() {
            ctx.output
                .success(&format!("Switched to branch '{}'", args.branch))?;
            return Ok(());
        }
        ctx.output.error(&format!(
            "Failed to checkout '{}': {}",
            args.branch,
            out.stderr.trim()
        ))?;
        Err(CliError::Forwarded { code: 1 })
    });

    if let Some(steps) = steps.filter(|s| s.needs_upgrade) {
        let (repo, dir) = migration::alembic_repo(ctx, config)?;
        if git.current_branch(&dir) == args.branch {
            migration::upgrade(ctx, repo, &dir)?;
        } else {
            debug!(?steps, "Checkout of the db repo failed, skipping upgrade");
        }
    }
    result
}

/// Plan and run the downgrade half of `checkout --migrate`. Returns the
/// steps so the upgrade can follow the switch.
fn migrate_before_checkout(
    ctx: &Context,
    config: &WorkspaceConfig,
    target: &str,
) -> CliResult<Option<MigrationSteps>> {
    let (repo, dir) = migration::alembic_repo(ctx, config)?;
    let plan = migration::plan(ctx, repo, &dir, target)?;
    migration::print_plan(ctx, repo, target, &plan)?;

    match plan {
        MigrationPlan::Steps(steps) => {
            migration::downgrade(ctx, repo, &dir, &steps)?;
            Ok(Some(steps))
        }
        MigrationPlan::NotNeeded | MigrationPlan::Unreachable { .. } => Ok(None),
    }
}

// ── prune ─────────────────────────────────────────────────────────────────────

fn prune(ctx: &Context, git: &GitService, dir: &Path) -> CliResult<()> {
    let stale = git.stale_branches(dir)?;
    if stale.is_empty() {
        ctx.output.print("No stale branches.")?;
        return Ok(());
    }
    ctx.output.print("Stale branches:")?;
    for branch in &stale {
        ctx.output.print(&format!("  {branch}"))?;
    }
    ctx.confirm_destructive(&format!("Deleting {} local branch(es).", stale.len()))?;

    let mut failures = 0;
    for branch in &stale {
        let out = git.delete_branch(dir, branch)?;
        if out.success() {
            ctx.output.success(&format!("Deleted {branch}"))?;
        } else {
            failures += 1;
            ctx.output
                .error(&format!("Failed to delete {branch}: {}", out.stderr.trim()))?;
        }
    }
    info!(deleted = stale.len() - failures, failures, "Prune finished");
    if failures > 0 {
        return Err(CliError::Forwarded { code: 1 });
    }
    Ok(())
}

// ── pr ────────────────────────────────────────────────────────────────────────

fn pr(ctx: &Context, repos: &[&RepoConfig], cmd: PrCommand) -> CliResult<()> {
    let github = ctx.github();
    github.ensure_available()?;
    let git = ctx.git();

    match cmd {
        PrCommand::Create(args) => ctx.for_each_repo(repos, |repo, dir| {
            ctx.output
                .repo_header(&format!("--- {} ---", repo.name), repo.color)?;
            create_pr(ctx, &github, &git, dir, &args)
        }),

        PrCommand::Ls => ctx.for_each_repo(repos, |repo, dir| {
            let prs = github.list(dir)?;
            if prs.is_empty() {
                return Ok(());
            }
            ctx.output
                .repo_header(&format!("--- {} ---", repo.name), repo.color)?;
            for pr in prs {
                ctx.output.print(&format!("  #{}: {}", pr.number, pr.title))?;
                ctx.output.print(&format!("    Branch: {}", pr.head_ref_name))?;
            }
            Ok(())
        }),

        PrCommand::Open { number } => ctx.for_each_repo(repos, |repo, dir| {
            ctx.output
                .repo_header(&format!("--- {} ---", repo.name), repo.color)?;
            if let Some(url) = git.remote_url(dir) {
                ctx.output
                    .print(&format!("  PR URL: {}/pull/{number}", github_web_url(&url)))?;
            }
            let out = github.checkout(dir, number)?;
            if !out.success() {
                return Err(failed(&format!("gh pr checkout {number}"), &out));
            }
            ctx.output.success(&format!("Checked out PR #{number}"))?;
            Ok(())
        }),
    }
}

fn create_pr(
    ctx: &Context,
    github: &GithubService,
    git: &GitService,
    dir: &Path,
    args: &PrCreateArgs,
) -> CliResult<()> {
    let head = git.current_branch(dir);
    let base = args
        .base
        .as_deref()
        .unwrap_or(&ctx.config.git.default_branch);
    let request = NewPullRequest {
        head: &head,
        base,
        title: &args.title,
        draft: args.draft,
    };
    match github.create(dir, &request)? {
        PrCreated::Created { url } => ctx.output.success(&format!("Created PR: {url}"))?,
        PrCreated::AlreadyExists => ctx.output.print("  PR already exists")?,
    }
    Ok(())
}
