//! Shared Types Module
//!
//! Data types shared across the controller.

pub mod decimal;
pub mod host_zone;
pub mod ica;
pub mod msg;
pub mod records;

// Re-exports for convenience
pub use decimal::{Dec, DecParseError};
pub use host_zone::{HostZone, Validator, ValidatorStatus};
pub use ica::{format_ica_account_owner, IcaAccount, IcaAccountStatus, IcaAccountType};
pub use msg::{
    AddValidatorMsg, DeleteValidatorMsg, RegisterHostZoneMsg, RegisterHostZoneResponse,
    ValidationError,
};
pub use records::{EpochUnbondingRecord, HostZoneUnbonding, HostZoneUnbondingStatus};

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
