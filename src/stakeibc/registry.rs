//! Host Zone Registry
//!
//! Owns the registered host zones. Enforces one zone per chain id at the
//! point of write; serialising concurrent registrations is left to the
//! orchestrator.

use std::sync::Arc;

use super::error::RegistryError;
use crate::storage::{HostZoneStore, StorageError};
use crate::types::{
    format_ica_account_owner, unix_now, Dec, HostZone, IcaAccountStatus, IcaAccountType,
    Validator,
};

pub struct HostZoneRegistry {
    store: Arc<dyn HostZoneStore>,
}

impl HostZoneRegistry {
    pub fn new(store: Arc<dyn HostZoneStore>) -> Self {
        Self { store }
    }

    /// Read a zone by chain id
    pub async fn lookup(&self, chain_id: &str) -> Result<Option<HostZone>, RegistryError> {
        Ok(self.store.get(chain_id).await?)
    }

    /// Persist a new zone with both redemption rates reset to one
    pub async fn register(&self, mut zone: HostZone) -> Result<HostZone, RegistryError> {
        zone.redemption_rate = Dec::one();
        zone.last_redemption_rate = Dec::one();

        self.insert(&zone).await?;
        Ok(zone)
    }

    /// Persist a zone exactly as given (genesis import)
    pub async fn restore(&self, zone: &HostZone) -> Result<(), RegistryError> {
        self.insert(zone).await
    }

    async fn insert(&self, zone: &HostZone) -> Result<(), RegistryError> {
        match self.store.insert(zone).await {
            Ok(()) => Ok(()),
            Err(StorageError::Duplicate(_)) => {
                Err(RegistryError::AlreadyRegistered(zone.chain_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Owner label of the account with `role` on `chain_id`
    pub fn derive_account_owner_label(chain_id: &str, role: IcaAccountType) -> String {
        format_ica_account_owner(chain_id, role)
    }

    pub async fn all_zones(&self) -> Result<Vec<HostZone>, RegistryError> {
        Ok(self.store.list().await?)
    }

    async fn require(&self, chain_id: &str) -> Result<HostZone, RegistryError> {
        self.store
            .get(chain_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(chain_id.to_string()))
    }

    async fn save(&self, zone: &mut HostZone) -> Result<(), RegistryError> {
        zone.touch(unix_now());
        match self.store.update(zone).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(RegistryError::NotFound(zone.chain_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Record the provisioning status of one account role
    pub async fn mark_account(
        &self,
        chain_id: &str,
        role: IcaAccountType,
        status: IcaAccountStatus,
        error: Option<String>,
    ) -> Result<HostZone, RegistryError> {
        let mut zone = self.require(chain_id).await?;
        let now = unix_now();

        match zone.account_mut(role) {
            Some(account) => {
                account.status = status;
                account.last_error = error;
                account.updated_at = now;
            }
            None => {
                // Zones restored from older state may lack a slot
                let mut account = crate::types::IcaAccount::new(chain_id, role, now);
                account.status = status;
                account.last_error = error;
                zone.ica_accounts.push(account);
                zone.ica_accounts.sort_by_key(|a| a.role);
            }
        }

        self.save(&mut zone).await?;
        Ok(zone)
    }

    /// Acknowledge that the account for `role` opened at `address`
    pub async fn record_account_opened(
        &self,
        chain_id: &str,
        role: IcaAccountType,
        address: &str,
    ) -> Result<HostZone, RegistryError> {
        let mut zone = self
            .mark_account(chain_id, role, IcaAccountStatus::Open, None)
            .await?;

        if let Some(account) = zone.account_mut(role) {
            account.address = Some(address.to_string());
        }
        self.save(&mut zone).await?;

        Ok(zone)
    }

    /// Roles that still need a creation request
    pub async fn pending_roles(
        &self,
        chain_id: &str,
    ) -> Result<Vec<IcaAccountType>, RegistryError> {
        Ok(self.require(chain_id).await?.pending_roles())
    }

    pub async fn add_validator(
        &self,
        chain_id: &str,
        validator: Validator,
    ) -> Result<HostZone, RegistryError> {
        let mut zone = self.require(chain_id).await?;

        if zone.validator(&validator.address).is_some() {
            return Err(RegistryError::ValidatorExists {
                chain_id: chain_id.to_string(),
                address: validator.address,
            });
        }

        zone.validators.push(validator);
        self.save(&mut zone).await?;
        Ok(zone)
    }

    pub async fn remove_validator(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<Validator, RegistryError> {
        let mut zone = self.require(chain_id).await?;

        let index = zone
            .validators
            .iter()
            .position(|v| v.address == address)
            .ok_or_else(|| RegistryError::ValidatorNotFound {
                chain_id: chain_id.to_string(),
                address: address.to_string(),
            })?;

        let removed = zone.validators.remove(index);
        self.save(&mut zone).await?;
        Ok(removed)
    }
}
