//! # ms
//!
//! Multi-repo workspace toolkit: git, docker compose, venv, env-file and
//! alembic commands fanned out over the git repositories under the
//! current directory.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI arguments (clap handles `--help` / `--version` early-exit),
//!    rewriting `ms <alias> <command>` into `ms repo <alias> <command>`.
//! 2. Initialise the tracing subscriber (logging).
//! 3. Load the tool settings (file + env + defaults).
//! 4. Build the [`OutputManager`] and the command [`Context`].
//! 5. Dispatch to the appropriate command handler.
//! 6. Translate any [`CliError`] into a user-facing message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                                  |
//! |------|------------------------------------------|
//! |  0   | Success                                  |
//! |  1   | Internal error or a wrapped command failed |
//! |  2   | Usage, input or settings error; cancelled |
//! |  3   | Preflight: workspace not usable          |
//! |  4   | Env conflicts under strict mode          |
//! |  5   | I/O error                                |
//!
//! Passthrough commands (`ms git …`, `ms diff`, `ms tf …`) exit with the
//! wrapped command's own status.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    context::Context,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod context;
mod error;
mod interact;
mod logging;
mod output;

fn main() -> ExitCode {
    // Load .env before anything else, including tracing init. A missing
    // file is fine.
    let _ = dotenvy::dotenv();

    // ── 1. Parse arguments ────────────────────────────────────────────────
    let cli = match Cli::try_parse().and_then(Cli::resolve_external) {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here as well.
            let _ = e.print();
            return ExitCode::from(if e.use_stderr() { 2 } else { 0 });
        }
    };

    // ── 2. Initialise tracing ─────────────────────────────────────────────
    let _log_guard = match init_logging(&cli.global) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            return ExitCode::from(1);
        }
    };

    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        no_color = cli.global.no_color,
        repos = ?cli.global.repos,
        "CLI started"
    );

    // ── 3. Load settings ──────────────────────────────────────────────────
    let config = match AppConfig::load(cli.global.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load settings: {e:#}");
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    // ── 4. Build output manager and context ───────────────────────────────
    let verbose = cli.global.verbose > 0;
    let output = OutputManager::new(&cli.global, &config);
    let mut ctx = match Context::new(cli.global, config, output) {
        Ok(ctx) => ctx,
        Err(e) => return handle_error(e, verbose),
    };

    // ── 5. Dispatch + 6. Error handling ──────────────────────────────────
    match run(cli.command, &mut ctx) {
        Ok(()) => {
            info!("ms completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose),
    }
}

/// Dispatch to the correct command handler.
#[instrument(skip_all)]
fn run(command: Commands, ctx: &mut Context) -> CliResult<()> {
    match command {
        Commands::Setup => commands::setup::execute(ctx),
        Commands::Aliases => commands::aliases::execute(ctx),
        Commands::Git(cmd) => commands::git::execute(cmd, ctx),
        Commands::Env(cmd) => commands::env::execute(cmd, ctx),
        Commands::Compose(cmd) => commands::compose::execute(cmd, ctx),
        Commands::Venv(cmd) => commands::venv::execute(cmd, ctx),
        Commands::Migration(cmd) => commands::migration::execute(cmd, ctx),
        Commands::Tf(args) => commands::tf::execute(args, ctx),
        Commands::Shell(cmd) => commands::shell::execute(cmd, ctx),
        Commands::Complete(cmd) => commands::complete::execute(cmd, ctx),
        Commands::Prompt(args) => commands::prompt::execute(args, ctx),
        Commands::Completions(args) => commands::completions::execute(args),
        Commands::Config(cmd) => commands::config::execute(cmd, ctx),
        Commands::Repo(args) => commands::repo(args.alias, args.command, ctx),
        // `resolve_external` has already rewritten this into `Repo`.
        Commands::External(args) => Err(CliError::InvalidInput {
            message: format!("Unknown command: {}", args.join(" ")),
            source: None,
        }),
    }
}

/// Translate a `CliError` into a user message and an exit code.
fn handle_error(err: CliError, verbose: bool) -> ExitCode {
    err.log();

    if !err.is_silent() {
        // Written to stderr so it shows even when stdout is redirected.
        let msg = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            err.format_colored(verbose)
        } else {
            err.format_plain(verbose)
        };
        eprint!("{msg}");
    }

    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        // Clap's internal consistency check: missing values, conflicts, etc.
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_version_matches_cargo() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn cli_has_author() {
        let cmd = Cli::command();
        assert!(cmd.get_author().is_some());
    }
}
