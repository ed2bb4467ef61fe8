//! Epoch Unbonding Records
//!
//! One record per epoch, holding at most one unbonding entry per host zone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unbonding state of a host zone within an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostZoneUnbondingStatus {
    /// Stake still bonded, unbonding not yet triggered
    #[default]
    Bonded,
    /// Unbonding completed on the host
    Unbonded,
    /// Unbonded funds transferred back to the controller
    Transferred,
}

impl fmt::Display for HostZoneUnbondingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bonded => write!(f, "BONDED"),
            Self::Unbonded => write!(f, "UNBONDED"),
            Self::Transferred => write!(f, "TRANSFERRED"),
        }
    }
}

/// Pending unbonding for one host zone in one epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostZoneUnbonding {
    pub host_zone_id: String,
    pub denom: String,
    pub amount: u64,
    pub status: HostZoneUnbondingStatus,
}

impl HostZoneUnbonding {
    /// Zero-amount bonded placeholder for a newly registered zone
    pub fn placeholder(host_zone_id: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            host_zone_id: host_zone_id.into(),
            denom: denom.into(),
            amount: 0,
            status: HostZoneUnbondingStatus::Bonded,
        }
    }
}

/// Unbonding record for one epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochUnbondingRecord {
    pub id: u64,
    /// Sorted by `host_zone_id`, unique per host zone
    #[serde(default)]
    pub host_zone_unbondings: Vec<HostZoneUnbonding>,
    /// Write counter maintained by the store
    #[serde(default)]
    pub version: u64,
}

impl EpochUnbondingRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            host_zone_unbondings: Vec::new(),
            version: 0,
        }
    }

    pub fn host_zone_unbonding(&self, host_zone_id: &str) -> Option<&HostZoneUnbonding> {
        self.host_zone_unbondings
            .iter()
            .find(|u| u.host_zone_id == host_zone_id)
    }

    pub fn contains(&self, host_zone_id: &str) -> bool {
        self.host_zone_unbonding(host_zone_id).is_some()
    }

    /// Insert keeping entries sorted; returns false if the zone already has one
    pub fn insert(&mut self, entry: HostZoneUnbonding) -> bool {
        match self
            .host_zone_unbondings
            .binary_search_by(|u| u.host_zone_id.as_str().cmp(entry.host_zone_id.as_str()))
        {
            Ok(_) => false,
            Err(pos) => {
                self.host_zone_unbondings.insert(pos, entry);
                true
            }
        }
    }

    /// Host zone ids in sorted order
    pub fn host_zone_ids(&self) -> Vec<&str> {
        self.host_zone_unbondings
            .iter()
            .map(|u| u.host_zone_id.as_str())
            .collect()
    }

    /// Whether every host zone appears at most once
    pub fn has_unique_host_zones(&self) -> bool {
        let mut ids = self.host_zone_ids();
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        ids.len() == len
    }
}
