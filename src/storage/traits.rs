//! Storage Trait Definitions
//!
//! Defines abstract storage interfaces for host zones and epoch unbonding
//! records. Implementations can use SQLite (production) or in-memory (testing).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{EpochUnbondingRecord, HostZone};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Version conflict on {key}: expected {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Host zone storage interface
///
/// Implementations:
/// - `SqliteStore` - Production storage with SQLite
/// - `MemoryHostZoneStore` - In-memory storage for testing
#[async_trait]
pub trait HostZoneStore: Send + Sync {
    /// Get a zone by chain id
    async fn get(&self, chain_id: &str) -> StorageResult<Option<HostZone>>;

    /// Insert a new zone; fails with `Duplicate` if the chain id exists.
    /// The existence check and the write are atomic.
    async fn insert(&self, zone: &HostZone) -> StorageResult<()>;

    /// Replace an existing zone
    async fn update(&self, zone: &HostZone) -> StorageResult<()>;

    /// All zones, ordered by chain id
    async fn list(&self) -> StorageResult<Vec<HostZone>>;

    /// Delete a zone by chain id
    async fn delete(&self, chain_id: &str) -> StorageResult<bool>;
}

/// Epoch unbonding record storage interface
///
/// Every write bumps the stored `version`. A freshly created record is
/// stored at version 0.
#[async_trait]
pub trait EpochUnbondingStore: Send + Sync {
    /// Get a record by epoch id
    async fn get(&self, epoch_id: u64) -> StorageResult<Option<EpochUnbondingRecord>>;

    /// Record with the highest epoch id
    async fn latest(&self) -> StorageResult<Option<EpochUnbondingRecord>>;

    /// Unconditionally write a record, replacing any prior version
    async fn put(&self, record: &EpochUnbondingRecord) -> StorageResult<()>;

    /// Write a record only if the stored version equals `record.version`
    async fn compare_and_swap(&self, record: &EpochUnbondingRecord) -> StorageResult<()>;

    /// All records, ordered by epoch id
    async fn list(&self) -> StorageResult<Vec<EpochUnbondingRecord>>;

    /// Delete a record by epoch id
    async fn delete(&self, epoch_id: u64) -> StorageResult<bool>;
}
