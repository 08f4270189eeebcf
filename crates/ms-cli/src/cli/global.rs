//! Global arguments that apply to every subcommand.
//!
//! Declared here and flattened into [`super::Cli`] so that `-v`, `-q`, `-r`
//! etc. are available on any invocation without repetition.

use clap::Args;
use std::path::PathBuf;

/// Global arguments for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    ///
    /// Pass once for INFO (`-v`), twice for DEBUG (`-vv`), three times for
    /// TRACE (`-vvv`).  Conflicts with `--quiet`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv, -vvv)",
        long_help = "Increase logging verbosity:
    (none)  - Only warnings and errors
    -v      - Info level (progress messages)
    -vv     - Debug level (commands being run)
    -vvv    - Trace level (very verbose)"
    )]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Disable ANSI colour codes.
    ///
    /// Automatically honoured when `NO_COLOR` is set in the environment
    /// (see <https://no-color.org>).
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new(),
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Tool settings file (defaults to ~/.config/ms/config.toml).
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Tool settings file path"
    )]
    pub config: Option<PathBuf>,

    /// Restrict a fan-out command to these repositories.
    #[arg(
        short = 'r',
        long = "repo",
        global = true,
        value_name = "ALIAS|NAME",
        action = clap::ArgAction::Append,
        help = "Limit to a repository (repeatable)"
    )]
    pub repos: Vec<String>,

    /// Answer yes to destructive-operation confirmations.
    #[arg(
        short = 'y',
        long = "yes",
        global = true,
        help = "Skip confirmation prompts"
    )]
    pub yes: bool,

    /// Also write logs to this file (no ANSI codes).
    #[arg(
        long = "log-file",
        global = true,
        env = "MS_LOG_FILE",
        value_name = "FILE",
        help = "Append logs to a file"
    )]
    pub log_file: Option<PathBuf>,
}
