//! Common Error Types for the StakeIBC Controller
//!
//! Provides unified error handling across all modules.

use thiserror::Error;

use crate::genesis::GenesisError;
use crate::records::LedgerError;
use crate::stakeibc::{RegistrationError, RegistryError};
use crate::storage::StorageError;

/// Root error type for the controller
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Epoch ledger errors
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Host zone registry errors
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Registration and admin operation errors
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Genesis import/export errors
    #[error("genesis error: {0}")]
    Genesis(#[from] GenesisError),

    /// API server errors
    #[error("API error: {0}")]
    Api(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Registration(e) => e.is_retryable(),
            ControllerError::Ledger(LedgerError::Contended { .. }) => true,
            ControllerError::Storage(_) | ControllerError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ControllerError::Config(_) => "CONFIG_ERROR",
            ControllerError::Logging(_) => "LOGGING_ERROR",
            ControllerError::Storage(_) => "STORAGE_ERROR",
            ControllerError::Ledger(LedgerError::EpochNotAdvancing { .. }) => "EPOCH_NOT_ADVANCING",
            ControllerError::Ledger(LedgerError::EpochIdOutOfRange { .. }) => {
                "EPOCH_ID_OUT_OF_RANGE"
            }
            ControllerError::Ledger(_) => "LEDGER_ERROR",
            ControllerError::Registry(RegistryError::NotFound(_)) => "HOST_ZONE_NOT_FOUND",
            ControllerError::Registry(_) => "REGISTRY_ERROR",
            ControllerError::Registration(e) => e.error_code(),
            ControllerError::Genesis(_) => "GENESIS_ERROR",
            ControllerError::Api(_) => "API_ERROR",
            ControllerError::Io(_) => "IO_ERROR",
        }
    }
}

/// Result type alias using ControllerError
pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_codes_pass_through() {
        let err: ControllerError = RegistrationError::NoActiveEpoch.into();
        assert_eq!(err.error_code(), "NO_ACTIVE_EPOCH");
        assert_eq!(err.to_string(), "no epoch unbonding record exists");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ControllerError::from(StorageError::Connection("pool".into())).is_retryable());
        let contended = LedgerError::Contended {
            epoch_id: 1,
            attempts: 3,
        };
        assert!(ControllerError::from(contended).is_retryable());
        assert!(!ControllerError::api("bad route").is_retryable());
    }

    #[test]
    fn test_epoch_not_advancing_code() {
        let err = ControllerError::from(LedgerError::EpochNotAdvancing { epoch_id: 1, latest: 2 });
        assert_eq!(err.error_code(), "EPOCH_NOT_ADVANCING");
    }
}
