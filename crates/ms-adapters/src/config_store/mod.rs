//! Workspace config stores.

mod json;
mod memory;

pub use json::JsonConfigStore;
pub use memory::MemoryConfigStore;
