//! StakeIBC Controller - Host Zone Registration and Epoch Unbonding Ledger
//!
//! Onboards remote chains ("host zones") reachable over an IBC connection and
//! keeps the per-epoch unbonding ledger in step with the registered set.
//!
//! ## Registration
//!
//! 1. **Resolve** - map the connection to the counterparty chain id
//! 2. **Persist** - store the host zone, rejecting duplicates
//! 3. **Provision** - request the DELEGATION, FEE, WITHDRAWAL and REDEMPTION
//!    interchain accounts, each owned by `"{chain_id}.{ROLE}"`
//! 4. **Ledger** - add a zero placeholder to the latest epoch record
//!
//! Accounts open asynchronously; the relayer reports them back through the
//! acknowledgement path. Failed roles are re-requested by reconciliation.

pub mod api;
pub mod app;
pub mod auth;
pub mod common;
pub mod events;
pub mod genesis;
pub mod ica;
pub mod records;
pub mod stakeibc;
pub mod storage;
pub mod types;

// Re-exports: wiring and API
pub use api::{create_router, start_server};
pub use app::App;

// Re-exports: configuration and errors
pub use common::{ConfigError, ControllerConfig, ControllerError, Network};

// Re-exports: authorization
pub use auth::{AdminAllowList, AuthorizationPolicy, DEFAULT_ADMINS};

// Re-exports: registration
pub use stakeibc::{
    HostZoneRegistry, RegistrationError, RegistrationOrchestrator, RegistrationStage,
    RegistryError,
};

// Re-exports: ledger
pub use records::{EpochUnbondingLedger, LedgerError};

// Re-exports: interchain accounts
pub use ica::{
    AccountProvisioner, AccountRequest, ChainResolver, ProvisionError, QueuedProvisioner,
    ResolveError, StaticChainResolver,
};

// Re-exports: events and genesis
pub use events::{EventBus, EventEnvelope, ZoneEvent};
pub use genesis::{GenesisError, GenesisState};

// Re-exports: domain types
pub use types::{
    Dec, EpochUnbondingRecord, HostZone, HostZoneUnbonding, HostZoneUnbondingStatus, IcaAccount,
    IcaAccountStatus, IcaAccountType, RegisterHostZoneMsg, RegisterHostZoneResponse,
};
