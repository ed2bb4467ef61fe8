//! In-Memory Storage Implementations
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the service restarts.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{EpochUnbondingStore, HostZoneStore, StorageError, StorageResult};
use crate::types::{EpochUnbondingRecord, HostZone};

/// In-memory host zone store
///
/// Thread-safe storage keyed by chain id.
/// Uses Arc<RwLock<>> for concurrent access.
#[derive(Clone, Default)]
pub struct MemoryHostZoneStore {
    zones: Arc<RwLock<BTreeMap<String, HostZone>>>,
}

impl MemoryHostZoneStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HostZoneStore for MemoryHostZoneStore {
    async fn get(&self, chain_id: &str) -> StorageResult<Option<HostZone>> {
        Ok(self.zones.read().await.get(chain_id).cloned())
    }

    async fn insert(&self, zone: &HostZone) -> StorageResult<()> {
        let mut zones = self.zones.write().await;

        if zones.contains_key(&zone.chain_id) {
            return Err(StorageError::Duplicate(format!("chain id: {}", zone.chain_id)));
        }

        zones.insert(zone.chain_id.clone(), zone.clone());
        Ok(())
    }

    async fn update(&self, zone: &HostZone) -> StorageResult<()> {
        let mut zones = self.zones.write().await;

        if !zones.contains_key(&zone.chain_id) {
            return Err(StorageError::NotFound(zone.chain_id.clone()));
        }

        zones.insert(zone.chain_id.clone(), zone.clone());
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<HostZone>> {
        Ok(self.zones.read().await.values().cloned().collect())
    }

    async fn delete(&self, chain_id: &str) -> StorageResult<bool> {
        Ok(self.zones.write().await.remove(chain_id).is_some())
    }
}

/// In-memory epoch unbonding record store
#[derive(Clone, Default)]
pub struct MemoryEpochUnbondingStore {
    records: Arc<RwLock<BTreeMap<u64, EpochUnbondingRecord>>>,
}

impl MemoryEpochUnbondingStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EpochUnbondingStore for MemoryEpochUnbondingStore {
    async fn get(&self, epoch_id: u64) -> StorageResult<Option<EpochUnbondingRecord>> {
        Ok(self.records.read().await.get(&epoch_id).cloned())
    }

    async fn latest(&self) -> StorageResult<Option<EpochUnbondingRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .next_back()
            .cloned())
    }

    async fn put(&self, record: &EpochUnbondingRecord) -> StorageResult<()> {
        let mut records = self.records.write().await;

        let version = records
            .get(&record.id)
            .map(|existing| existing.version + 1)
            .unwrap_or(0);

        let mut stored = record.clone();
        stored.version = version;
        records.insert(record.id, stored);
        Ok(())
    }

    async fn compare_and_swap(&self, record: &EpochUnbondingRecord) -> StorageResult<()> {
        let mut records = self.records.write().await;

        let current = records
            .get(&record.id)
            .ok_or_else(|| StorageError::NotFound(format!("epoch {}", record.id)))?;

        if current.version != record.version {
            return Err(StorageError::Conflict {
                key: format!("epoch {}", record.id),
                expected: record.version,
                actual: current.version,
            });
        }

        let mut stored = record.clone();
        stored.version = record.version + 1;
        records.insert(record.id, stored);
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<EpochUnbondingRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn delete(&self, epoch_id: u64) -> StorageResult<bool> {
        Ok(self.records.write().await.remove(&epoch_id).is_some())
    }
}
