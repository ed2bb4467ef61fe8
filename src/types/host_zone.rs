//! Host Zone Types
//!
//! A host zone is a remote chain on which stake is custodied. The record is
//! keyed by the chain id resolved from its connection.

use serde::{Deserialize, Serialize};

use super::decimal::Dec;
use super::ica::{IcaAccount, IcaAccountStatus, IcaAccountType};

/// Validator on a host zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub name: String,
    pub address: String,
    pub status: ValidatorStatus,
    /// Commission in percent
    pub commission_rate: u32,
    /// Amount delegated by the delegation account
    pub delegation_amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    #[default]
    Active,
    Inactive,
}

/// A registered host zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostZone {
    pub chain_id: String,
    pub connection_id: String,
    pub bech32_prefix: String,
    pub ibc_denom: String,
    pub host_denom: String,
    pub transfer_channel_id: String,
    pub redemption_rate: Dec,
    pub last_redemption_rate: Dec,
    pub unbonding_frequency: u64,
    #[serde(default)]
    pub validators: Vec<Validator>,
    /// One slot per account role, in provisioning order
    pub ica_accounts: Vec<IcaAccount>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl HostZone {
    /// Build a fresh zone with both redemption rates at exactly one and every
    /// account role not yet requested
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain_id: String,
        connection_id: String,
        bech32_prefix: String,
        ibc_denom: String,
        host_denom: String,
        transfer_channel_id: String,
        unbonding_frequency: u64,
        now: u64,
    ) -> Self {
        let ica_accounts = IcaAccountType::ALL
            .iter()
            .map(|role| IcaAccount::new(&chain_id, *role, now))
            .collect();

        Self {
            chain_id,
            connection_id,
            bech32_prefix,
            ibc_denom,
            host_denom,
            transfer_channel_id,
            redemption_rate: Dec::one(),
            last_redemption_rate: Dec::one(),
            unbonding_frequency,
            validators: Vec::new(),
            ica_accounts,
            created_at: now,
            updated_at: now,
        }
    }

    /// Account slot for a role
    pub fn account(&self, role: IcaAccountType) -> Option<&IcaAccount> {
        self.ica_accounts.iter().find(|a| a.role == role)
    }

    pub fn account_mut(&mut self, role: IcaAccountType) -> Option<&mut IcaAccount> {
        self.ica_accounts.iter_mut().find(|a| a.role == role)
    }

    /// Roles that still need a creation request, in provisioning order
    pub fn pending_roles(&self) -> Vec<IcaAccountType> {
        IcaAccountType::ALL
            .into_iter()
            .filter(|role| {
                self.account(*role)
                    .map(|a| a.status.needs_request())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Whether all four accounts are open on the foreign chain
    pub fn is_fully_provisioned(&self) -> bool {
        IcaAccountType::ALL.iter().all(|role| {
            self.account(*role)
                .map(|a| a.status == IcaAccountStatus::Open)
                .unwrap_or(false)
        })
    }

    pub fn validator(&self, address: &str) -> Option<&Validator> {
        self.validators.iter().find(|v| v.address == address)
    }

    pub fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_zone() -> HostZone {
        HostZone::new(
            "cosmoshub-4".to_string(),
            "connection-0".to_string(),
            "cosmos".to_string(),
            "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2".to_string(),
            "uatom".to_string(),
            "channel-0".to_string(),
            4,
            1_700_000_000,
        )
    }

    #[test]
    fn test_new_zone_rates_start_at_one() {
        let zone = sample_zone();
        assert_eq!(zone.redemption_rate, Dec::one());
        assert_eq!(zone.last_redemption_rate, zone.redemption_rate);
    }

    #[test]
    fn test_new_zone_has_one_slot_per_role() {
        let zone = sample_zone();
        assert_eq!(zone.ica_accounts.len(), 4);
        assert_eq!(zone.pending_roles(), IcaAccountType::ALL.to_vec());
        assert_eq!(
            zone.account(IcaAccountType::Fee).unwrap().owner,
            "cosmoshub-4.FEE"
        );
        assert!(!zone.is_fully_provisioned());
    }

    #[test]
    fn test_pending_roles_skip_requested_and_open() {
        let mut zone = sample_zone();
        zone.account_mut(IcaAccountType::Delegation).unwrap().status = IcaAccountStatus::Open;
        zone.account_mut(IcaAccountType::Fee).unwrap().status = IcaAccountStatus::Requested;
        zone.account_mut(IcaAccountType::Withdrawal).unwrap().status = IcaAccountStatus::Failed;

        assert_eq!(
            zone.pending_roles(),
            vec![IcaAccountType::Withdrawal, IcaAccountType::Redemption]
        );
    }
}
