//! Epoch Unbonding Records Module
//!
//! The ledger of per-epoch unbonding obligations.

pub mod ledger;

pub use ledger::{EpochUnbondingLedger, LedgerError, MAX_CAS_ATTEMPTS, MAX_EPOCH_ID};
