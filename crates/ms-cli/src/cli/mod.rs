//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::GlobalArgs;

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "ms",
    bin_name = "ms",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Multi-repo workspace toolkit",
    long_about = "ms treats the current directory as a workspace whose immediate \
                  children are git repositories, and runs git, docker compose, \
                  venv, env-file and migration commands across them.",
    after_help = "EXAMPLES:\n\
        \x20 ms setup\n\
        \x20 ms status\n\
        \x20 ms -r cs -r db pull\n\
        \x20 ms cs checkout feature/login --migrate\n\
        \x20 ms cs env set DATABASE_URL postgres://localhost/app\n\
        \x20 eval \"$(ms aliases)\"",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactively configure the workspace.
    #[command(about = "Configure repositories and env rules")]
    Setup,

    /// Print shell aliases for every configured repository.
    #[command(
        about = "Print shell aliases",
        after_help = "EXAMPLES:\n\
            \x20 eval \"$(ms aliases)\""
    )]
    Aliases,

    #[command(flatten)]
    Git(GitCommand),

    /// Env files across repositories.
    #[command(subcommand, about = "Inspect and edit env files")]
    Env(EnvCommand),

    /// docker compose across repositories.
    #[command(subcommand, about = "Docker compose shortcuts")]
    Compose(ComposeCommand),

    /// uv-managed virtualenvs.
    #[command(subcommand, about = "Python virtualenv management")]
    Venv(VenvCommand),

    /// Alembic migrations in the db-alembic repository.
    #[command(
        subcommand,
        visible_alias = "mig",
        about = "Database migrations",
        after_help = "EXAMPLES:\n\
            \x20 ms migration current\n\
            \x20 ms migration plan main\n\
            \x20 ms migration migrate main"
    )]
    Migration(MigrationCommand),

    /// Terraform shortcuts in the given directory.
    #[command(
        about = "Terraform shortcuts",
        after_help = "EXAMPLES:\n\
            \x20 ms tf plan --dir infra -- -out=tf.plan\n\
            \x20 ms tf apply --yes"
    )]
    Tf(TfArgs),

    /// Install the startup-file block.
    #[command(subcommand, about = "Shell integration")]
    Shell(ShellCommand),

    /// Completion helpers called from shell completion functions.
    #[command(subcommand, hide = true)]
    Complete(CompleteCommand),

    /// Print a prompt segment for the repository in the current directory.
    #[command(about = "Print a git prompt segment")]
    Prompt(PromptArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 ms completions bash > ~/.local/share/bash-completion/completions/ms\n\
            \x20 ms completions zsh  > /usr/local/share/zsh/site-functions/_ms"
    )]
    Completions(CompletionsArgs),

    /// Manage the ms tool settings.
    #[command(
        about = "Tool settings management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 ms config get git.default_branch\n\
            \x20 ms config set git.default_branch develop\n\
            \x20 ms config list"
    )]
    Config(ConfigCommands),

    /// Run a command in one repository.
    #[command(about = "Run a command in one repository")]
    Repo(RepoArgs),

    /// `ms <alias> <command>`.
    #[command(external_subcommand)]
    External(Vec<String>),
}

// ── git ───────────────────────────────────────────────────────────────────────

/// Commands that run in every selected repository.
#[derive(Debug, Subcommand)]
pub enum GitCommand {
    /// Branch and short status per repository.
    #[command(visible_alias = "st")]
    Status,

    /// `git fetch origin`.
    Fetch,

    /// `git pull`.
    Pull,

    /// Switch branches.
    #[command(visible_alias = "co")]
    Checkout(CheckoutArgs),

    /// Create and switch to a new branch.
    Branch(BranchArgs),

    /// List local and remote branches.
    Branches,

    /// Stage all changes.
    Add,

    /// Commit staged changes.
    Commit(CommitArgs),

    /// Push the current branch.
    Push(PushArgs),

    /// Delete local branches whose remote is gone.
    Prune(PruneArgs),

    /// Hard-reset to the remote branch (destructive).
    Reset(ResetArgs),

    /// `git diff` with the terminal attached.
    Diff(PassArgs),

    /// Any git command.
    #[command(
        after_help = "EXAMPLES:\n\
            \x20 ms git log --oneline -5\n\
            \x20 ms cs git stash list"
    )]
    Git(GitPassArgs),

    /// GitHub pull requests through `gh`.
    #[command(subcommand)]
    Pr(PrCommand),
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(value_name = "BRANCH")]
    pub branch: String,

    /// Move the database to the target branch's migrations.
    #[arg(long = "migrate", help = "Downgrade/upgrade alembic around the switch")]
    pub migrate: bool,
}

#[derive(Debug, Args)]
pub struct BranchArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(long = "push", help = "Push and set upstream after creating")]
    pub push: bool,
}

#[derive(Debug, Args)]
pub struct CommitArgs {
    #[arg(short = 'm', long = "message", value_name = "MSG", required = true)]
    pub message: String,
}

#[derive(Debug, Args)]
pub struct PushArgs {
    #[arg(long = "force", help = "Force push (refused on the default branch)")]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct PruneArgs {
    #[arg(long = "force", help = "Actually delete stale branches")]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Remote branch to reset to.
    #[arg(value_name = "BRANCH")]
    pub branch: String,
}

#[derive(Debug, Args)]
pub struct PassArgs {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct GitPassArgs {
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_name = "ARGS"
    )]
    pub args: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum PrCommand {
    /// Open a pull request for the current branch.
    Create(PrCreateArgs),

    /// List open pull requests.
    #[command(visible_alias = "list")]
    Ls,

    /// Print the PR URL and check it out locally.
    Open {
        #[arg(value_name = "NUMBER")]
        number: u64,
    },
}

#[derive(Debug, Args)]
pub struct PrCreateArgs {
    #[arg(short = 't', long = "title", value_name = "TITLE")]
    pub title: String,

    /// Defaults to `git.default_branch`.
    #[arg(short = 'b', long = "base", value_name = "BRANCH")]
    pub base: Option<String>,

    #[arg(long = "draft")]
    pub draft: bool,
}

// ── env ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum EnvCommand {
    /// Print env files, then check the rules.
    #[command(visible_alias = "list")]
    Ls,

    /// Set a key in one repository's env file.
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        /// Prompted for when omitted.
        #[arg(value_name = "VALUE")]
        value: Option<String>,
    },

    /// Check env consistency across repositories.
    Check,
}

// ── compose ───────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ComposeCommand {
    Up {
        #[arg(short = 'd', long = "detach")]
        detach: bool,
        #[arg(long = "build")]
        build: bool,
    },
    Down {
        /// Remove named volumes (destructive). `-v` is taken by --verbose.
        #[arg(short = 'V', long = "volumes")]
        volumes: bool,
    },
    Build,
}

// ── venv ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum VenvCommand {
    /// `uv venv .venv`.
    Create,

    /// Create if missing, then install requirements.
    Sync {
        #[arg(long = "requirements", value_name = "FILE", default_value = "requirements.txt")]
        requirements: String,
    },
}

// ── migration ────────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum MigrationCommand {
    /// Revision the database is at.
    Current,

    /// Show what switching to BRANCH would do.
    Plan {
        #[arg(value_name = "BRANCH")]
        target: String,
    },

    /// Downgrade to the revision shared with BRANCH.
    Migrate {
        #[arg(value_name = "BRANCH")]
        target: String,
    },

    /// `alembic upgrade head`.
    Upgrade,
}

// ── tf ────────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TfArgs {
    #[arg(value_enum)]
    pub action: TfAction,

    /// Directory holding the terraform configuration.
    #[arg(long = "dir", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Extra arguments for terraform, after `--`.
    #[arg(last = true, value_name = "ARGS")]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TfAction {
    Init,
    Plan,
    Apply,
    Destroy,
}

// ── shell ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Add or refresh the block in the startup file.
    Install(ShellTarget),
    /// Remove the block.
    Uninstall(ShellTarget),
    /// Report whether the block is present.
    Status(ShellTarget),
}

#[derive(Debug, Args)]
pub struct ShellTarget {
    /// Detected from $SHELL when omitted.
    #[arg(long = "shell", value_enum)]
    pub shell: Option<ShellName>,

    /// Startup file; defaults to ~/.zshrc or ~/.bashrc.
    #[arg(long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShellName {
    Zsh,
    Bash,
}

// ── complete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum CompleteCommand {
    Branches {
        #[arg(long = "remote")]
        remote: bool,
        #[arg(default_value = "")]
        prefix: String,
    },
    ChangedFiles,
}

// ── prompt ────────────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PromptArgs {
    #[arg(long = "format", value_enum, default_value = "plain")]
    pub format: PromptFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromptFormat {
    Plain,
    Zsh,
    Bash,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `ms completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `ms config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a setting.
    Get {
        /// Dotted key path, e.g. `git.default_branch`.
        key: String,
    },
    /// Set a setting and save it to the settings file.
    Set {
        /// Dotted key path.
        key: String,
        /// New value.
        value: String,
    },
    /// Print all settings.
    List,
    /// Print the path to the settings file.
    Path,
    /// Write a settings file with the defaults.
    Init {
        #[arg(short = 'f', long = "force", help = "Overwrite an existing file")]
        force: bool,
    },
}

// ── repo scope ────────────────────────────────────────────────────────────────

/// Arguments for `ms repo <alias> <command>`.
#[derive(Debug, Args)]
pub struct RepoArgs {
    /// Alias or directory name.
    #[arg(value_name = "ALIAS")]
    pub alias: String,

    #[command(subcommand)]
    pub command: RepoCommand,
}

/// Commands that make sense for a single repository.
#[derive(Debug, Subcommand)]
pub enum RepoCommand {
    #[command(flatten)]
    Git(GitCommand),

    #[command(subcommand)]
    Env(EnvCommand),

    #[command(subcommand)]
    Compose(ComposeCommand),

    #[command(subcommand)]
    Venv(VenvCommand),
}

impl Cli {
    /// Rewrite `ms <alias> <command…>` into `ms repo <alias> <command…>`.
    ///
    /// Global flags given before the alias are kept; flags given after it
    /// are merged in.
    pub fn resolve_external(self) -> Result<Self, clap::Error> {
        let Commands::External(args) = self.command else {
            return Ok(self);
        };
        let argv = ["ms".to_string(), "repo".to_string()]
            .into_iter()
            .chain(args);
        let inner = Cli::try_parse_from(argv)?;
        Ok(Cli {
            global: self.global.merge(inner.global),
            command: inner.command,
        })
    }
}

impl GlobalArgs {
    fn merge(self, later: GlobalArgs) -> GlobalArgs {
        let mut repos = self.repos;
        repos.extend(later.repos);
        GlobalArgs {
            verbose: self.verbose.max(later.verbose),
            quiet: self.quiet || later.quiet,
            no_color: self.no_color || later.no_color,
            config: later.config.or(self.config),
            repos,
            yes: self.yes || later.yes,
            log_file: later.log_file.or(self.log_file),
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
