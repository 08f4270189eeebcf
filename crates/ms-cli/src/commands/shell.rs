//! `ms shell`: manage the integration block in a shell startup file.

use std::path::PathBuf;

use tracing::{debug, instrument};

use ms_core::application::ShellChange;
use ms_core::domain::ShellKind;

use crate::{
    cli::{ShellCommand, ShellName, ShellTarget},
    context::Context,
    error::{CliError, CliResult},
};

#[instrument(skip_all)]
pub fn execute(cmd: ShellCommand, ctx: &Context) -> CliResult<()> {
    let shell = ctx.shell();
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();

    match cmd {
        ShellCommand::Install(target) => {
            let (kind, file) = resolve(&target)?;
            let platform = (std::env::consts::OS, std::env::consts::ARCH);
            match shell.install(&file, kind, platform, &stamp)? {
                ShellChange::Unchanged => {
                    ctx.output
                        .info(&format!("{} already up to date", file.display()))?;
                }
                ShellChange::Written { edit, backup } => {
                    report_backup(ctx, backup)?;
                    for line in edit.diff_preview().lines() {
                        ctx.output.print(line)?;
                    }
                    ctx.output.success(&format!(
                        "Installed {} integration in {}",
                        kind.as_str(),
                        file.display()
                    ))?;
                    ctx.output
                        .info(&format!("Restart your shell or run: source {}", file.display()))?;
                }
            }
        }
        ShellCommand::Uninstall(target) => {
            let (_, file) = resolve(&target)?;
            match shell.uninstall(&file, &stamp)? {
                ShellChange::Unchanged => {
                    ctx.output
                        .info(&format!("{}: nothing to remove", file.display()))?;
                }
                ShellChange::Written { backup, .. } => {
                    report_backup(ctx, backup)?;
                    ctx.output
                        .success(&format!("Removed integration from {}", file.display()))?;
                }
            }
        }
        ShellCommand::Status(target) => {
            let (_, file) = resolve(&target)?;
            let state = if shell.is_installed(&file)? {
                "installed"
            } else {
                "not installed"
            };
            ctx.output.data(&format!("{}: {state}", file.display()))?;
        }
    }
    Ok(())
}

fn report_backup(ctx: &Context, backup: Option<PathBuf>) -> CliResult<()> {
    if let Some(backup) = backup {
        ctx.output.info(&format!("Backup: {}", backup.display()))?;
    }
    Ok(())
}

/// Shell from `--shell`, else `$SHELL`, else zsh. File from `--file`, else
/// the shell's rc file in the home directory.
fn resolve(target: &ShellTarget) -> CliResult<(ShellKind, PathBuf)> {
    let kind = match target.shell {
        Some(ShellName::Zsh) => ShellKind::Zsh,
        Some(ShellName::Bash) => ShellKind::Bash,
        None => std::env::var("SHELL")
            .ok()
            .and_then(|s| ShellKind::from_shell_path(&s))
            .unwrap_or(ShellKind::Zsh),
    };
    debug!(shell = kind.as_str(), "Shell resolved");

    let file = match &target.file {
        Some(file) => file.clone(),
        None => dirs::home_dir()
            .map(|home| home.join(kind.rc_file()))
            .ok_or_else(|| CliError::InvalidInput {
                message: "Cannot find the home directory; pass --file".into(),
                source: None,
            })?,
    };
    Ok((kind, file))
}
