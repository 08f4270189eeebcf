//! Infrastructure adapters for ms.
//!
//! This crate implements the ports defined in `ms-core::application::ports`.
//! It contains all process spawning and file I/O.

pub mod config_store;
pub mod filesystem;
pub mod process;

// Re-export commonly used adapters
pub use config_store::{JsonConfigStore, MemoryConfigStore};
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use process::{ScriptedRunner, SystemRunner};
