//! Interchain Account Types
//!
//! Every host zone gets four custodial accounts on the foreign chain, one per
//! role. The owner label is what the remote chain keys the account by, so it
//! must be unique per `(chain_id, role)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Custodial account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IcaAccountType {
    Delegation,
    Fee,
    Withdrawal,
    Redemption,
}

impl IcaAccountType {
    /// All roles, in provisioning order
    pub const ALL: [IcaAccountType; 4] = [
        IcaAccountType::Delegation,
        IcaAccountType::Fee,
        IcaAccountType::Withdrawal,
        IcaAccountType::Redemption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delegation => "DELEGATION",
            Self::Fee => "FEE",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Redemption => "REDEMPTION",
        }
    }
}

impl fmt::Display for IcaAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IcaAccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DELEGATION" => Ok(Self::Delegation),
            "FEE" => Ok(Self::Fee),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            "REDEMPTION" => Ok(Self::Redemption),
            _ => Err(format!("unknown ICA account type: {}", s)),
        }
    }
}

/// Owner label for a host zone's account of the given role.
///
/// Chain ids never contain '.', so `"{chain_id}.{ROLE}"` cannot collide
/// across chains or roles.
pub fn format_ica_account_owner(chain_id: &str, role: IcaAccountType) -> String {
    format!("{}.{}", chain_id, role.as_str())
}

/// Provisioning status of one account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IcaAccountStatus {
    /// No creation request issued yet
    #[default]
    NotRequested,
    /// Creation request enqueued, acknowledgement outstanding
    Requested,
    /// Request could not be enqueued
    Failed,
    /// Account exists on the foreign chain
    Open,
}

impl IcaAccountStatus {
    /// Whether the role still needs a creation request
    pub fn needs_request(&self) -> bool {
        matches!(self, Self::NotRequested | Self::Failed)
    }
}

impl fmt::Display for IcaAccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => write!(f, "not_requested"),
            Self::Requested => write!(f, "requested"),
            Self::Failed => write!(f, "failed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// A custodial account slot on a host zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcaAccount {
    pub role: IcaAccountType,
    /// Owner label the foreign chain keys this account by
    pub owner: String,
    pub status: IcaAccountStatus,
    /// Foreign-chain address, known once the account is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Most recent provisioning error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub updated_at: u64,
}

impl IcaAccount {
    pub fn new(chain_id: &str, role: IcaAccountType, now: u64) -> Self {
        Self {
            role,
            owner: format_ica_account_owner(chain_id, role),
            status: IcaAccountStatus::NotRequested,
            address: None,
            last_error: None,
            updated_at: now,
        }
    }
}
