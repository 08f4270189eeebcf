//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! per-repository operations. Fan-out across repositories and all printing
//! live in the CLI; a service only ever touches one repository per call.

pub mod compose_service;
pub mod env_service;
pub mod git_service;
pub mod github_service;
pub mod migration_service;
pub mod shell_service;
pub mod terraform_service;
pub mod venv_service;
pub mod workspace_service;

pub use compose_service::{ComposeAction, ComposeService};
pub use env_service::{CurrentValue, EnvListing, EnvService};
pub use git_service::{GitService, PushPlan, RepoStatus, ResetReport};
pub use github_service::{GithubService, NewPullRequest, PrCreated};
pub use migration_service::{MigrationService, MigrationTimeouts};
pub use shell_service::{ShellChange, ShellService};
pub use terraform_service::{TerraformAction, TerraformService};
pub use venv_service::{DEFAULT_REQUIREMENTS, VenvService};
pub use workspace_service::WorkspaceService;
