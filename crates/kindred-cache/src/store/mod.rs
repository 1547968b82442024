//! Key-value persistence module.
//!
//! Adapters for the [`kindred_core::KeyValueStore`] port.

mod file_store;
pub mod keys;
mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
