//! Epoch Unbonding Ledger
//!
//! Owns the per-epoch unbonding records. Entry insertion is a read-modify-write
//! guarded by the store's compare-and-swap, retried a bounded number of times.

use std::sync::Arc;
use thiserror::Error;

use crate::common::logging::log_ledger_event;
use crate::storage::{EpochUnbondingStore, StorageError};
use crate::types::{EpochUnbondingRecord, HostZoneUnbonding};

/// Compare-and-swap attempts before giving up
pub const MAX_CAS_ATTEMPTS: usize = 3;

/// Largest epoch id every store can key and order correctly
pub const MAX_EPOCH_ID: u64 = i64::MAX as u64;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("epoch {epoch_id} does not advance past latest epoch {latest}")]
    EpochNotAdvancing { epoch_id: u64, latest: u64 },

    #[error("epoch id {epoch_id} exceeds the maximum of {max}")]
    EpochIdOutOfRange { epoch_id: u64, max: u64 },

    #[error("entry for {entry} cannot be stored under key {key}")]
    KeyMismatch { key: String, entry: String },

    #[error("epoch {epoch_id} still contended after {attempts} attempts")]
    Contended { epoch_id: u64, attempts: usize },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Epoch unbonding ledger
pub struct EpochUnbondingLedger {
    store: Arc<dyn EpochUnbondingStore>,
}

impl EpochUnbondingLedger {
    pub fn new(store: Arc<dyn EpochUnbondingStore>) -> Self {
        Self { store }
    }

    /// Most recently created epoch record, if any epoch was ever started
    pub async fn latest_record(&self) -> Result<Option<EpochUnbondingRecord>, LedgerError> {
        Ok(self.store.latest().await?)
    }

    pub async fn get_record(
        &self,
        epoch_id: u64,
    ) -> Result<Option<EpochUnbondingRecord>, LedgerError> {
        Ok(self.store.get(epoch_id).await?)
    }

    /// All records ordered by epoch id
    pub async fn all_records(&self) -> Result<Vec<EpochUnbondingRecord>, LedgerError> {
        Ok(self.store.list().await?)
    }

    /// Open a new, empty epoch record
    ///
    /// The id must be greater than every existing epoch id and no larger
    /// than `MAX_EPOCH_ID`.
    pub async fn start_epoch(&self, epoch_id: u64) -> Result<EpochUnbondingRecord, LedgerError> {
        if epoch_id > MAX_EPOCH_ID {
            return Err(LedgerError::EpochIdOutOfRange {
                epoch_id,
                max: MAX_EPOCH_ID,
            });
        }

        if let Some(latest) = self.store.latest().await? {
            if epoch_id <= latest.id {
                return Err(LedgerError::EpochNotAdvancing {
                    epoch_id,
                    latest: latest.id,
                });
            }
        }

        let record = EpochUnbondingRecord::new(epoch_id);
        self.store.put(&record).await?;
        log_ledger_event("start-epoch", epoch_id, None, None);

        Ok(record)
    }

    /// Insert `entry` into epoch `epoch_id` under `host_zone_id`
    ///
    /// Returns `Ok(false)` without mutating anything if the epoch does not
    /// exist or already holds an entry for the host zone.
    pub async fn insert_host_zone_entry(
        &self,
        epoch_id: u64,
        host_zone_id: &str,
        entry: HostZoneUnbonding,
    ) -> Result<bool, LedgerError> {
        if entry.host_zone_id != host_zone_id {
            return Err(LedgerError::KeyMismatch {
                key: host_zone_id.to_string(),
                entry: entry.host_zone_id,
            });
        }

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let mut record = match self.store.get(epoch_id).await? {
                Some(record) => record,
                None => return Ok(false),
            };

            if !record.insert(entry.clone()) {
                return Ok(false);
            }

            match self.store.compare_and_swap(&record).await {
                Ok(()) => {
                    log_ledger_event("insert-host-zone-entry", epoch_id, Some(host_zone_id), None);
                    return Ok(true);
                }
                Err(StorageError::Conflict { expected, actual, .. }) => {
                    tracing::debug!(
                        target: "stakeibc::ledger",
                        epoch_id,
                        attempt,
                        expected,
                        actual,
                        "epoch record changed underneath insert, retrying"
                    );
                }
                // Deleted between read and write
                Err(StorageError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Contended {
            epoch_id,
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Write a full record, replacing the stored version
    pub async fn persist(&self, record: &EpochUnbondingRecord) -> Result<(), LedgerError> {
        self.store.put(record).await?;
        Ok(())
    }

    /// Persist an externally supplied record (genesis), normalising entry order
    pub async fn import(&self, mut record: EpochUnbondingRecord) -> Result<(), LedgerError> {
        record
            .host_zone_unbondings
            .sort_by(|a, b| a.host_zone_id.cmp(&b.host_zone_id));
        self.persist(&record).await
    }
}
