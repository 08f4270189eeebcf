//! ms Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for `ms`, the
//! multi-repo workspace toolkit, following hexagonal (ports and adapters)
//! architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              ms-cli (CLI)               │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (Workspace, Env, Git, Migration, ...)  │
//! │         Orchestrates Use Cases          │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Driven: Runner, ConfigStore, Filesys)  │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      ms-adapters (Infrastructure)       │
//! │ (SystemRunner, JsonConfigStore, etc)    │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (WorkspaceConfig, env rules, revisions) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ms_core::application::{GitService, ports::CommandRunner};
//!
//! fn branch_of(runner: Arc<dyn CommandRunner>) -> String {
//!     let git = GitService::new(runner, "origin");
//!     git.current_branch("./core-service".as_ref())
//! }
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ComposeService, EnvService, GitService, GithubService, MigrationService, ShellService,
        TerraformService, VenvService, WorkspaceService,
        ports::{CommandOutput, CommandRunner, CommandSpec, CommandStatus, ConfigStore, Filesystem},
    };
    pub use crate::domain::{
        EnvConflict, EnvMode, EnvRules, MatchGroup, MigrationPlan, MissingEnvPolicy, RepoColor,
        RepoConfig, RepoKind, WorkspaceConfig,
    };
    pub use crate::error::{MsError, MsResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
