//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `ms-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `CommandRunner`: spawning `git`, `gh`, `docker`, `uv`, `alembic`, `terraform`
//!   - `ConfigStore`: loading and saving `ms-config.json`
//!   - `Filesystem`: env files, startup files, repo discovery
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{
    CommandOutput, CommandRunner, CommandSpec, CommandStatus, ConfigStore, Filesystem,
};

#[cfg(test)]
pub use output::{MockCommandRunner, MockConfigStore, MockFilesystem};
