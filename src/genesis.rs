//! Genesis Import and Export
//!
//! The full controller state (host zones and epoch unbonding records) as one
//! JSON document, used to bootstrap a fresh store and to snapshot a live one.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::records::{EpochUnbondingLedger, LedgerError, MAX_EPOCH_ID};
use crate::stakeibc::{HostZoneRegistry, RegistryError};
use crate::types::{EpochUnbondingRecord, HostZone};

/// Genesis errors
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("invalid genesis: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub host_zones: Vec<HostZone>,
    #[serde(default)]
    pub epoch_unbonding_records: Vec<EpochUnbondingRecord>,
}

impl GenesisState {
    /// Stateless consistency checks
    pub fn validate(&self) -> Result<(), GenesisError> {
        let mut chain_ids = HashSet::new();
        for zone in &self.host_zones {
            if zone.chain_id.trim().is_empty() {
                return Err(GenesisError::Invalid("host zone with empty chain id".into()));
            }
            if !chain_ids.insert(zone.chain_id.as_str()) {
                return Err(GenesisError::Invalid(format!(
                    "duplicate host zone {}",
                    zone.chain_id
                )));
            }
            if zone.redemption_rate.is_zero() || zone.last_redemption_rate.is_zero() {
                return Err(GenesisError::Invalid(format!(
                    "host zone {} has a zero redemption rate",
                    zone.chain_id
                )));
            }
            for account in &zone.ica_accounts {
                let expected =
                    HostZoneRegistry::derive_account_owner_label(&zone.chain_id, account.role);
                if account.owner != expected {
                    return Err(GenesisError::Invalid(format!(
                        "account owner {} does not match {}",
                        account.owner, expected
                    )));
                }
            }
        }

        let mut epoch_ids = HashSet::new();
        for record in &self.epoch_unbonding_records {
            if record.id > MAX_EPOCH_ID {
                return Err(GenesisError::Invalid(format!(
                    "epoch unbonding record id {} out of range",
                    record.id
                )));
            }
            if !epoch_ids.insert(record.id) {
                return Err(GenesisError::Invalid(format!(
                    "duplicate epoch unbonding record {}",
                    record.id
                )));
            }
            if !record.has_unique_host_zones() {
                return Err(GenesisError::Invalid(format!(
                    "epoch {} lists a host zone more than once",
                    record.id
                )));
            }
        }

        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenesisError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GenesisError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Load a validated genesis state into empty stores
pub async fn init_genesis(
    state: &GenesisState,
    registry: &HostZoneRegistry,
    ledger: &EpochUnbondingLedger,
) -> Result<(), GenesisError> {
    state.validate()?;

    for zone in &state.host_zones {
        registry.restore(zone).await?;
    }
    for record in &state.epoch_unbonding_records {
        ledger.import(record.clone()).await?;
    }

    tracing::info!(
        target: "stakeibc::genesis",
        host_zones = state.host_zones.len(),
        epochs = state.epoch_unbonding_records.len(),
        "genesis imported"
    );

    Ok(())
}

/// Snapshot the current state
pub async fn export_genesis(
    registry: &HostZoneRegistry,
    ledger: &EpochUnbondingLedger,
) -> Result<GenesisState, GenesisError> {
    Ok(GenesisState {
        host_zones: registry.all_zones().await?,
        epoch_unbonding_records: ledger.all_records().await?,
    })
}
