//! Request and Response Messages
//!
//! Inbound messages carry the caller (`creator`) so the authorization policy
//! can be applied before anything else happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::host_zone::Validator;

/// Basic (stateless) validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

/// Bech32 human-readable part: 1-83 lowercase alphanumeric characters
pub fn validate_bech32_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.is_empty() || prefix.len() > 83 {
        return Err(ValidationError::new(
            "bech32_prefix",
            "length must be between 1 and 83",
        ));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::new(
            "bech32_prefix",
            format!("{} is not lowercase alphanumeric", prefix),
        ));
    }
    Ok(())
}

/// Register a new host zone reachable over `connection_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterHostZoneMsg {
    pub creator: String,
    pub connection_id: String,
    pub bech32_prefix: String,
    pub ibc_denom: String,
    pub host_denom: String,
    pub transfer_channel_id: String,
    pub unbonding_frequency: u64,
}

impl RegisterHostZoneMsg {
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("connection_id", &self.connection_id)?;
        require_non_empty("ibc_denom", &self.ibc_denom)?;
        require_non_empty("host_denom", &self.host_denom)?;
        require_non_empty("transfer_channel_id", &self.transfer_channel_id)?;
        validate_bech32_prefix(&self.bech32_prefix)?;

        if self.unbonding_frequency == 0 {
            return Err(ValidationError::new(
                "unbonding_frequency",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Identity of a successfully registered zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterHostZoneResponse {
    pub chain_id: String,
    pub connection_id: String,
}

/// Add a validator to a host zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddValidatorMsg {
    pub creator: String,
    pub host_zone: String,
    pub validator: Validator,
}

impl AddValidatorMsg {
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("host_zone", &self.host_zone)?;
        require_non_empty("validator.name", &self.validator.name)?;
        require_non_empty("validator.address", &self.validator.address)?;
        if self.validator.commission_rate > 100 {
            return Err(ValidationError::new(
                "validator.commission_rate",
                "must be a percentage between 0 and 100",
            ));
        }
        Ok(())
    }
}

/// Remove a validator from a host zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteValidatorMsg {
    pub creator: String,
    pub host_zone: String,
    pub validator_address: String,
}

impl DeleteValidatorMsg {
    pub fn validate_basic(&self) -> Result<(), ValidationError> {
        require_non_empty("creator", &self.creator)?;
        require_non_empty("host_zone", &self.host_zone)?;
        require_non_empty("validator_address", &self.validator_address)
    }
}
