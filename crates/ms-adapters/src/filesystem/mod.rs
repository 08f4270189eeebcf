//! Filesystem adapters.

mod local;
mod memory;

pub use local::LocalFilesystem;
pub(crate) use local::{map_io_error, write_atomic};
pub use memory::MemoryFilesystem;
