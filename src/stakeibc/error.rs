//! Registration Error Taxonomy

use thiserror::Error;

use crate::ica::ResolveError;
use crate::records::LedgerError;
use crate::storage::StorageError;
use crate::types::{IcaAccountType, ValidationError};

/// Host zone registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("host zone already registered: {0}")]
    AlreadyRegistered(String),

    #[error("host zone not found: {0}")]
    NotFound(String),

    #[error("validator {address} already exists on {chain_id}")]
    ValidatorExists { chain_id: String, address: String },

    #[error("validator {address} not found on {chain_id}")]
    ValidatorNotFound { chain_id: String, address: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors surfaced by the registration orchestrator
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("caller {0} is not authorized")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("cannot resolve chain id for {connection_id}: {source}")]
    ChainResolution {
        connection_id: String,
        #[source]
        source: ResolveError,
    },

    #[error("host zone already registered: {0}")]
    DuplicateHostZone(String),

    #[error("host zone not found: {0}")]
    HostZoneNotFound(String),

    #[error("failed to provision {role} account: {reason}")]
    AccountProvisioning { role: IcaAccountType, reason: String },

    #[error("no epoch unbonding record exists")]
    NoActiveEpoch,

    /// Logged only, never returned from a registration
    #[error("epoch {epoch_id} already holds an entry for {chain_id}")]
    LedgerInsertConflict { epoch_id: u64, chain_id: String },

    #[error("validator {address} already exists on {chain_id}")]
    ValidatorExists { chain_id: String, address: String },

    #[error("validator {address} not found on {chain_id}")]
    ValidatorNotFound { chain_id: String, address: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<RegistryError> for RegistrationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRegistered(chain_id) => Self::DuplicateHostZone(chain_id),
            RegistryError::NotFound(chain_id) => Self::HostZoneNotFound(chain_id),
            RegistryError::ValidatorExists { chain_id, address } => {
                Self::ValidatorExists { chain_id, address }
            }
            RegistryError::ValidatorNotFound { chain_id, address } => {
                Self::ValidatorNotFound { chain_id, address }
            }
            RegistryError::Storage(e) => Self::Storage(e),
        }
    }
}

impl RegistrationError {
    /// Stable code used in API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ChainResolution { .. } => "CHAIN_RESOLUTION_ERROR",
            Self::DuplicateHostZone(_) => "DUPLICATE_HOST_ZONE",
            Self::HostZoneNotFound(_) => "HOST_ZONE_NOT_FOUND",
            Self::AccountProvisioning { .. } => "ACCOUNT_PROVISIONING_ERROR",
            Self::NoActiveEpoch => "NO_ACTIVE_EPOCH",
            Self::LedgerInsertConflict { .. } => "LEDGER_INSERT_CONFLICT",
            Self::ValidatorExists { .. } => "VALIDATOR_EXISTS",
            Self::ValidatorNotFound { .. } => "VALIDATOR_NOT_FOUND",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the same request may succeed if retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ChainResolution { .. }
                | Self::Ledger(LedgerError::Contended { .. })
                | Self::Storage(_)
        )
    }

    /// Whether durable state may have been written before the failure
    ///
    /// Ledger and storage failures can surface after the zone was persisted,
    /// so they count as partial. `reconcile_accounts` finishes such a zone.
    pub fn leaves_partial_state(&self) -> bool {
        matches!(
            self,
            Self::AccountProvisioning { .. }
                | Self::NoActiveEpoch
                | Self::Ledger(_)
                | Self::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_errors_map_to_registration_errors() {
        let err: RegistrationError = RegistryError::AlreadyRegistered("cosmoshub-4".into()).into();
        assert!(matches!(err, RegistrationError::DuplicateHostZone(ref id) if id == "cosmoshub-4"));
        assert_eq!(err.error_code(), "DUPLICATE_HOST_ZONE");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provisioning_error_names_role() {
        let err = RegistrationError::AccountProvisioning {
            role: IcaAccountType::Withdrawal,
            reason: "queue full".into(),
        };
        assert!(err.to_string().contains("WITHDRAWAL"));
        assert!(err.leaves_partial_state());
    }

    #[test]
    fn test_partial_state_classes() {
        let storage = RegistrationError::Storage(StorageError::Connection("closed".into()));
        assert!(storage.leaves_partial_state());

        let ledger = RegistrationError::Ledger(LedgerError::Contended {
            epoch_id: 3,
            attempts: 3,
        });
        assert!(ledger.leaves_partial_state());

        assert!(!RegistrationError::DuplicateHostZone("cosmoshub-4".into()).leaves_partial_state());
        assert!(!RegistrationError::Unauthorized("stride1nobody".into()).leaves_partial_state());
    }
}
