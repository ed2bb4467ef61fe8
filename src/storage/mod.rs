//! Storage Layer Module
//!
//! Provides persistence for host zones and epoch unbonding records.
//!
//! This module contains:
//! - Storage trait definitions for abstraction
//! - SQLite implementation for production
//! - In-memory implementation for testing

pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience
pub use memory::{MemoryEpochUnbondingStore, MemoryHostZoneStore};
pub use sqlite::SqliteStore;
pub use traits::{EpochUnbondingStore, HostZoneStore, StorageError, StorageResult};
