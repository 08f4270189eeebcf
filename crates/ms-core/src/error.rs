//! Unified error handling for ms Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for ms Core operations.
///
/// Domain and application errors are transparent: their own messages are
/// already phrased for the user (e.g. "ms-config.json not found. Run: ms setup.").
#[derive(Debug, Error, Clone)]
pub enum MsError {
    /// Errors from the domain layer (rule violations).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Errors from the application layer (I/O, subprocess, preflight).
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl MsError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Internal { .. } => vec![
                "This appears to be a bug in ms".into(),
                "Please report this issue at: https://github.com/cosecruz/ms/issues".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::NotFound
                | crate::domain::ErrorCategory::Workspace => ErrorCategory::Preflight,
                crate::domain::ErrorCategory::Conflict => ErrorCategory::EnvConflict,
            },
            Self::Application(e) => e.category(),
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input or a rule the user can fix by changing arguments.
    Validation,
    /// Workspace not usable yet: missing config, repo, env file.
    Preflight,
    /// Env values disagree across repos under strict mode.
    EnvConflict,
    /// A wrapped external tool failed or is missing.
    ExternalCommand,
    /// Reading or writing a file failed.
    Io,
    Internal,
}

/// Convenient result type alias.
pub type MsResult<T> = Result<T, MsError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> MsResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> MsResult<T> {
        self.map_err(|e| MsError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
