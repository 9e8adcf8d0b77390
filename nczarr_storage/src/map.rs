//! Map backends included in this crate.

mod memory_map;
pub use memory_map::{MemoryMap, MemoryMapOptions};
