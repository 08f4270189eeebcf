// ============================================================================
// domain/error.rs - WORKSPACE RULE VIOLATIONS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (they travel through `MsError`)
/// - Categorizable (for CLI display and exit codes)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Unsupported schemaVersion: {found}")]
    UnsupportedSchemaVersion { found: String },

    #[error("Alias cannot be empty")]
    EmptyAlias,

    #[error("Alias '{alias}' is not unique. Run: ms setup.")]
    DuplicateAlias { alias: String },

    #[error("Repository '{name}' is already configured")]
    DuplicateRepo { name: String },

    #[error("A db-alembic repo already exists ({existing}). Only one allowed.")]
    MultipleAlembicRepos { existing: String },

    #[error("Repository '{repo}' is db-alembic but has no revisions directory")]
    MissingRevisionsDirectory { repo: String },

    #[error("Unknown repository type '{value}'. Expected app or db-alembic")]
    InvalidRepoKind { value: String },

    #[error("Invalid color '{value}'. Must be a named color or #RRGGBB")]
    InvalidColor { value: String },

    #[error("Invalid env key '{key}'. Expected [A-Z0-9_]+.")]
    InvalidEnvKey { key: String },

    #[error("Invalid {field} '{value}'")]
    InvalidSetting { field: &'static str, value: String },

    #[error("Cannot force push to default branch '{branch}'")]
    ForcePushToDefault { branch: String },

    #[error("Unbalanced shell integration markers in startup file: {reason}")]
    MalformedStartupBlock { reason: String },

    #[error("Could not parse {what}: {reason}")]
    UnparsableOutput { what: &'static str, reason: String },

    // ========================================================================
    // Not Found Errors
    // ========================================================================
    #[error("Unknown repo '{selector}'")]
    UnknownRepo { selector: String },

    #[error("No db-alembic repository is configured")]
    NoAlembicRepo,

    // ========================================================================
    // Conflicts
    // ========================================================================
    #[error("{count} env conflict(s) detected")]
    EnvConflicts { count: usize },

    #[error(
        "Database is at revision {revision}, which is missing from both current and target branches. Cannot calculate migration path."
    )]
    UnreachableRevision {
        revision: String,
        found_in_branches: Vec<String>,
    },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnsupportedSchemaVersion { .. } => vec![
                "Only schemaVersion 1 is supported".into(),
                "Re-create the config with: ms setup".into(),
            ],
            Self::DuplicateAlias { .. } | Self::DuplicateRepo { .. } | Self::EmptyAlias => {
                vec!["Run 'ms setup' and choose 'Modify repo'".into()]
            }
            Self::MultipleAlembicRepos { existing } => vec![
                format!("'{existing}' is already the db-alembic repository"),
                "Add this repository with type 'app' instead".into(),
            ],
            Self::InvalidColor { .. } => vec![
                "Named colors: black, red, green, yellow, blue, magenta, cyan, white".into(),
                "Custom colors use hex notation, e.g. #ff00ff".into(),
            ],
            Self::InvalidEnvKey { .. } => vec![
                "Keys may only contain letters, digits and underscores".into(),
                "Example: ms cs env set DATABASE_URL".into(),
            ],
            Self::ForcePushToDefault { branch } => vec![
                format!("Push to '{branch}' without --force"),
                "Or switch to a feature branch first: ms branch <name>".into(),
            ],
            Self::MalformedStartupBlock { .. } => vec![
                "Open the startup file and remove the partial 'ms shell integration' block".into(),
                "Then run: ms shell install".into(),
            ],
            Self::UnknownRepo { .. } => vec![
                "List configured repositories with: ms aliases".into(),
                "Add repositories with: ms setup".into(),
            ],
            Self::NoAlembicRepo => vec![
                "Add a repository of type db-alembic with: ms setup".into(),
            ],
            Self::EnvConflicts { .. } => vec![
                "Align the values listed above, or".into(),
                "add the key to ignoreKeys via: ms setup → Modify env rules".into(),
                "Switch env mode to 'warn' to report conflicts without failing".into(),
            ],
            Self::UnreachableRevision {
                found_in_branches, ..
            } => {
                if found_in_branches.is_empty() {
                    vec!["The revision was not found in any local branch".into()]
                } else {
                    let mut out = vec!["The revision exists in these local branches:".into()];
                    out.extend(found_in_branches.iter().map(|b| format!("  • {b}")));
                    out.push("Check out one of them and downgrade manually".into());
                    out
                }
            }
            _ => vec!["See 'ms --help' for usage".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownRepo { .. } | Self::NoAlembicRepo => ErrorCategory::NotFound,
            Self::EnvConflicts { .. } => ErrorCategory::Conflict,
            Self::UnsupportedSchemaVersion { .. }
            | Self::EmptyAlias
            | Self::DuplicateAlias { .. }
            | Self::DuplicateRepo { .. }
            | Self::MultipleAlembicRepos { .. }
            | Self::MissingRevisionsDirectory { .. } => ErrorCategory::Workspace,
            // Refused before any env file is read, like other preflight checks.
            Self::InvalidEnvKey { .. } => ErrorCategory::Workspace,
            _ => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    /// The workspace config itself breaks a rule.
    Workspace,
}
