//! Interchain Account Collaborators
//!
//! - Account provisioning (queued locally or forwarded to a relayer)
//! - Connection to chain id resolution (static map or LCD query)

pub mod provisioner;
pub mod resolver;

pub use provisioner::{
    AccountProvisioner, AccountRequest, ProvisionError, QueuedProvisioner, RelayerProvisioner,
};
pub use resolver::{ChainResolver, LcdChainResolver, ResolveError, StaticChainResolver};

#[cfg(test)]
pub use provisioner::MockAccountProvisioner;
#[cfg(test)]
pub use resolver::MockChainResolver;
