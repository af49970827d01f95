//! Durable last-known-good snapshot cache.
//!
//! This module provides a resource-agnostic cache that:
//! - Keeps one JSON payload per resource key, stamped with the write time
//! - Survives restarts through a SQLite backend
//! - Never fails a read: missing, corrupt or unreadable entries are a miss
//! - Never fails a write: storage errors are logged and swallowed

mod entry;
mod storage;
mod store;

pub use entry::CacheEntry;
pub use storage::{CacheStorage, MemoryStorage, SqliteStorage};
pub use store::CacheStore;
