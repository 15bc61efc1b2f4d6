//! Durable key/value storage backends.
//!
//! Provides `KeyValueStore` implementations for:
//! - In-memory (tests, throwaway sessions)
//! - JSON file on disk (the CLI's local storage)

mod file;
mod inmemory;

pub use file::FileStore;
pub use inmemory::MemoryStore;
