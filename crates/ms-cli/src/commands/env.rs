//! `ms env`: list and edit env files, and check the workspace env rules.

use tracing::{instrument, warn};

use ms_core::application::{CurrentValue, EnvListing};
use ms_core::domain::env;
use ms_core::prelude::*;

use crate::{
    cli::EnvCommand,
    context::Context,
    error::{CliError, CliResult},
};

#[instrument(skip_all)]
pub fn execute(cmd: EnvCommand, ctx: &Context) -> CliResult<()> {
    let config = ctx.preflight()?;
    match cmd {
        EnvCommand::Ls => list(ctx, &config),
        EnvCommand::Set { key, value } => set(ctx, &config, &key, value),
        EnvCommand::Check => check(ctx, &config),
    }
}

/// One repository: its errors fail the command. Several: each failure is
/// logged and the listing goes on.
fn list(ctx: &Context, config: &WorkspaceConfig) -> CliResult<()> {
    let repos = ctx.selected(config)?;
    if repos.is_empty() {
        ctx.output.print("No repositories configured.")?;
        return Ok(());
    }

    if let [repo] = repos.as_slice() {
        list_one(ctx, config, repo)?;
    } else {
        for (i, repo) in repos.iter().enumerate() {
            if i > 0 {
                ctx.output.print("")?;
            }
            if let Err(err) = list_one(ctx, config, repo) {
                warn!(repo = %repo.name, error = %err, "Skipping env listing");
                ctx.output.error(&err.to_string())?;
            }
        }
    }
    check(ctx, config)
}

fn list_one(ctx: &Context, config: &WorkspaceConfig, repo: &RepoConfig) -> CliResult<()> {
    match ctx.env().list(repo, config.env.missing_env_file)? {
        EnvListing::Missing { path, policy } => {
            if policy != MissingEnvPolicy::Ignore {
                ctx.output
                    .print(&format!("{} {} (missing)", repo.name, path.display()))?;
            }
        }
        EnvListing::Vars(vars) => {
            ctx.output.repo_header(
                &format!("--- {} ({}) ---", repo.name, repo.env_file),
                repo.color,
            )?;
            for (key, value) in &vars {
                ctx.output.print(&format!("{key}={value}"))?;
            }
        }
    }
    Ok(())
}

fn set(
    ctx: &Context,
    config: &WorkspaceConfig,
    key: &str,
    value: Option<String>,
) -> CliResult<()> {
    env::validate_key(key).map_err(MsError::from)?;
    let repo = single_repo(ctx, config)?;
    let envs = ctx.env();

    match envs.current_value(repo, key)? {
        CurrentValue::Set(current) => ctx.output.print(&format!("Current {key}: {current}"))?,
        CurrentValue::Unset => ctx.output.print(&format!("{key} not set."))?,
        CurrentValue::FileMissing => ctx.output.print(&format!("{key} not set (file missing)."))?,
    }

    let related = envs.related_values(config, repo, key)?;
    if !related.is_empty() {
        ctx.output.print("Related values:")?;
        for m in &related {
            ctx.output
                .print(&format!("  {}: {}={} ({})", m.repo, m.key, m.value, m.source))?;
        }
    }

    let value = match value {
        Some(value) => value,
        None => ctx.input(&format!("Enter new value for {key}"), "")?,
    };
    if value.is_empty() {
        ctx.output.print("No changes made.")?;
        return Ok(());
    }

    if !envs.set(repo, key, &value)? {
        ctx.output.print("Value unchanged.")?;
        return Ok(());
    }
    ctx.output.success(&format!("Updated {key}."))?;

    let conflicts = report_conflicts(ctx, config)?;
    if let Err(err) = env::enforce(config.env.mode, &conflicts) {
        ctx.output.stderr("Conflicts detected!")?;
        return Err(MsError::from(err).into());
    }
    Ok(())
}

/// Fails under strict mode when any rule is broken.
fn check(ctx: &Context, config: &WorkspaceConfig) -> CliResult<()> {
    let conflicts = report_conflicts(ctx, config)?;
    env::enforce(config.env.mode, &conflicts).map_err(MsError::from)?;
    Ok(())
}

fn report_conflicts(ctx: &Context, config: &WorkspaceConfig) -> CliResult<Vec<EnvConflict>> {
    let conflicts = ctx.env().check(config)?;
    for conflict in &conflicts {
        ctx.output.stderr(&conflict.to_string())?;
    }
    Ok(conflicts)
}

/// `env set` edits exactly one file.
fn single_repo<'a>(ctx: &Context, config: &'a WorkspaceConfig) -> CliResult<&'a RepoConfig> {
    match ctx.global.repos.as_slice() {
        [selector] => Ok(config.require_repo(selector).map_err(MsError::from)?),
        _ => Err(CliError::InvalidInput {
            message: "env set needs one repository: ms <alias> env set KEY".into(),
            source: None,
        }),
    }
}
