//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `ms-adapters` crate provides implementations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::WorkspaceConfig;
use crate::error::MsResult;

/// A command line to run, independent of how it is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program and arguments joined by spaces, for messages.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Successful output with the given stdout. Handy for fakes.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Exit status of a command that ran with inherited stdio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus(pub Option<i32>);

impl CommandStatus {
    pub const SUCCESS: CommandStatus = CommandStatus(Some(0));

    pub fn success(&self) -> bool {
        self.0 == Some(0)
    }

    /// Exit code to forward, `1` when the process died without one.
    pub fn code(&self) -> i32 {
        self.0.unwrap_or(1)
    }
}

/// Port for running external programs.
///
/// Implemented by:
/// - `ms_adapters::process::SystemRunner` (production)
/// - `ms_adapters::process::ScriptedRunner` (testing)
///
/// A non-zero exit is not an error at this level: callers inspect the
/// status. Errors mean the program could not be started or timed out.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run and capture stdout/stderr.
    fn capture(&self, spec: &CommandSpec) -> MsResult<CommandOutput>;

    /// Run with the terminal attached, so output and pagers behave as if
    /// the user typed the command.
    fn stream(&self, spec: &CommandSpec) -> MsResult<CommandStatus>;

    /// Whether `program` resolves on `PATH`.
    fn is_available(&self, program: &str) -> bool;
}

/// Port for the workspace config document.
///
/// Implemented by:
/// - `ms_adapters::config_store::JsonConfigStore` (production)
/// - `ms_adapters::config_store::MemoryConfigStore` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait ConfigStore: Send + Sync {
    /// Where the config lives (for messages).
    fn location(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Load and check the schema version. A missing file is
    /// `ApplicationError::ConfigNotFound`.
    fn load(&self) -> MsResult<WorkspaceConfig>;

    /// Persist atomically.
    fn save(&self, config: &WorkspaceConfig) -> MsResult<()>;
}

/// Port for filesystem operations.
///
/// Implemented by:
/// - `ms_adapters::filesystem::LocalFilesystem` (production)
/// - `ms_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// File contents, or `None` when the file does not exist.
    fn read_to_string(&self, path: &Path) -> MsResult<Option<String>>;

    /// Replace a file via a temp file in the same directory. Existing
    /// permissions are kept.
    fn write_atomic(&self, path: &Path, content: &str) -> MsResult<()>;

    /// Copy `from` to `to`, overwriting.
    fn copy(&self, from: &Path, to: &Path) -> MsResult<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the immediate subdirectories of `path`, sorted.
    fn list_dirs(&self, path: &Path) -> MsResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_display_joins_args() {
        let spec = CommandSpec::new("git").args(["status", "-sb"]).cwd("/w/api");
        assert_eq!(spec.display(), "git status -sb");
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/w/api")));
    }

    #[test]
    fn killed_process_forwards_failure() {
        assert_eq!(CommandStatus(None).code(), 1);
        assert_eq!(CommandStatus(Some(3)).code(), 3);
        assert!(CommandStatus::SUCCESS.success());
    }
}
