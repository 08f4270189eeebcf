//! Application layer for ms.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (GitService, EnvService, MigrationService, ...)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! workspace rules itself. All rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    ComposeAction, ComposeService, CurrentValue, EnvListing, EnvService, GitService,
    GithubService, MigrationService, MigrationTimeouts, NewPullRequest, PrCreated, PushPlan,
    RepoStatus, ResetReport, ShellChange, ShellService, TerraformAction, TerraformService, VenvService,
    WorkspaceService,
};

// Re-export port traits (for adapter implementation)
pub use ports::{CommandRunner, ConfigStore, Filesystem};

pub use error::ApplicationError;
