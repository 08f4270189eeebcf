// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for ms.
//!
//! Pure workspace logic: the config model, env-file rules, alembic revision
//! planning, startup-file editing and parsers for the text that `git` and
//! `gh` print. Nothing here spawns a process or touches the filesystem; the
//! application layer feeds it strings and persists what it returns.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No I/O**: callers pass file contents and command output in
//! - **Deterministic**: repos in config order, keys in sorted order
//! - **Immutable results**: edits return new content instead of mutating
//!   anything on disk
//!
pub mod color;
pub mod env;
pub mod error;
pub mod git;
pub mod migration;
pub mod prompt;
pub mod shell;
pub mod workspace;

pub use color::{NamedColor, RepoColor};
pub use env::{EnvConflict, EnvMap, KeyMatch, MatchSource, RepoEnv};
pub use error::{DomainError, ErrorCategory};
pub use git::PullRequest;
pub use migration::{MigrationPlan, MigrationSteps, Revision};
pub use prompt::{PromptInfo, PromptStyle};
pub use shell::{ShellKind, StartupFileEdit};
pub use workspace::{
    AlembicSettings, CONFIG_FILENAME, EnvMode, EnvRules, MatchGroup, MissingEnvPolicy,
    RepoConfig, RepoKind, WorkspaceConfig, WorkspaceInfo,
};

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Cross-module scenarios
    // ========================================================================

    #[test]
    fn config_round_trips_through_json() {
        let mut cfg = WorkspaceConfig::default();
        cfg.add_repo(RepoConfig::new("api", "api").with_color(RepoColor::ORANGE))
            .unwrap();
        cfg.env.add_match_group("sql", "DB_HOST, SQL_SERVER").unwrap();

        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let back: WorkspaceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
        assert!(json.contains("\"color\": \"#FFA500\""));
    }

    #[test]
    fn conflicts_respect_config_rules() {
        let mut cfg = WorkspaceConfig::default();
        cfg.env.add_ignore_key("PORT");

        let envs = [
            RepoEnv::new("a", env::parse("PORT=1\nHOST=x\n")),
            RepoEnv::new("b", env::parse("PORT=2\nHOST=\"x\"\n")),
        ];
        assert!(env::find_conflicts(&cfg.env, &envs).is_empty());
    }
}
