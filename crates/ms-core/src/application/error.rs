//! Application layer errors.
//!
//! These errors represent failures in orchestration (missing files,
//! external tools, subprocesses), not workspace rules. Rule violations are
//! `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while driving external tools and files.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    // ── Preflight ─────────────────────────────────────────────────────────────
    #[error("ms-config.json not found. Run: ms setup.")]
    ConfigNotFound { path: PathBuf },

    #[error("ms-config.json invalid JSON: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Configured repo '{name}' missing or not a git repo. Run: ms setup.")]
    RepoMissing { name: String },

    #[error("Env file missing: {}", path.display())]
    EnvFileMissing { path: PathBuf },

    #[error("No docker-compose.yml found in {}", path.display())]
    ComposeFileMissing { path: PathBuf },

    #[error("Requirements file not found: {}", path.display())]
    RequirementsMissing { path: PathBuf },

    #[error(
        "Alembic not found in venv at {}. Run 'ms venv sync' first to set up the virtual environment.",
        path.display()
    )]
    AlembicNotFound { path: PathBuf },

    #[error("Could not determine current database revision. Database may be unreachable.")]
    UnknownDbRevision,

    // ── External commands ─────────────────────────────────────────────────────
    #[error("'{tool}' command not found. {hint}")]
    ToolNotFound { tool: String, hint: String },

    #[error("`{command}` failed{}: {stderr}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {secs}s. Check database connection.")]
    CommandTimeout { command: String, secs: u64 },

    #[error("Failed to start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// One or more repositories failed during a fan-out command. Details
    /// were already printed per repo.
    #[error("{failed} of {total} repositories failed")]
    PartialFailure { failed: usize, total: usize },

    // ── Files ─────────────────────────────────────────────────────────────────
    #[error("Filesystem error at {}: {reason}", path.display())]
    FilesystemError { path: PathBuf, reason: String },

    /// In-memory store lock poisoned.
    #[error("Config store error")]
    StoreLockError,
}

impl ApplicationError {
    pub fn command_failed(command: impl Into<String>, status: Option<i32>, stderr: &str) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status,
            stderr: stderr.trim().to_string(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FilesystemError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ConfigNotFound { path } => vec![
                format!("Looked for: {}", path.display()),
                "Run 'ms setup' in the workspace root to create it".into(),
            ],
            Self::ConfigParse { path, .. } => vec![
                format!("Fix the JSON syntax in {}", path.display()),
                "Or delete the file and run: ms setup".into(),
            ],
            Self::RepoMissing { name } => vec![
                format!("Clone '{name}' into the workspace root"),
                "Or remove it from the config with: ms setup".into(),
            ],
            Self::EnvFileMissing { .. } => vec![
                "Create the env file, or".into(),
                "set missingEnvFile to 'warn' via: ms setup → Modify env rules".into(),
            ],
            Self::RequirementsMissing { .. } => {
                vec!["Pass another file with: ms venv sync --requirements <file>".into()]
            }
            Self::AlembicNotFound { .. } => vec!["Run: ms venv sync".into()],
            Self::UnknownDbRevision => vec![
                "Check the database connection settings in the repo's env file".into(),
                "Try: ms db current -v".into(),
            ],
            Self::ToolNotFound { tool, .. } => vec![
                format!("Install '{tool}' and make sure it is on your PATH"),
            ],
            Self::CommandTimeout { .. } => vec![
                "Make sure the database is running and reachable".into(),
                "Raise the limit with: ms config set migration.current_timeout_secs <secs>".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have read and write permissions".into(),
            ],
            Self::PartialFailure { .. } => vec!["See the per-repository output above".into()],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::RepoMissing { .. }
            | Self::EnvFileMissing { .. }
            | Self::ComposeFileMissing { .. }
            | Self::RequirementsMissing { .. }
            | Self::AlembicNotFound { .. } => ErrorCategory::Preflight,
            Self::UnknownDbRevision
            | Self::ToolNotFound { .. }
            | Self::CommandFailed { .. }
            | Self::CommandTimeout { .. }
            | Self::Spawn { .. }
            | Self::PartialFailure { .. } => ErrorCategory::ExternalCommand,
            Self::FilesystemError { .. } => ErrorCategory::Io,
            Self::StoreLockError => ErrorCategory::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_mentions_database() {
        let err = ApplicationError::CommandTimeout {
            command: "alembic current".into(),
            secs: 25,
        };
        assert_eq!(
            err.to_string(),
            "`alembic current` timed out after 25s. Check database connection."
        );
    }

    #[test]
    fn command_failed_trims_stderr() {
        let err = ApplicationError::command_failed("git pull", Some(1), "fatal: no remote\n");
        assert_eq!(err.to_string(), "`git pull` failed with status 1: fatal: no remote");
        assert_eq!(err.category(), ErrorCategory::ExternalCommand);
    }

    #[test]
    fn preflight_errors_are_categorized() {
        let err = ApplicationError::RepoMissing { name: "api".into() };
        assert_eq!(
            err.to_string(),
            "Configured repo 'api' missing or not a git repo. Run: ms setup."
        );
        assert_eq!(err.category(), ErrorCategory::Preflight);
    }
}
