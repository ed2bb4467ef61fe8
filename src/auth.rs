//! Authorization Policy
//!
//! Admin operations are gated by an injected `AuthorizationPolicy` so each
//! deployment (and each test) can supply its own allow-list.

use std::collections::BTreeSet;

/// Built-in admin addresses, accepted on localnet and testnet only
pub const DEFAULT_ADMINS: [&str; 2] = [
    "stride1k8c2m5cn322akk5wy8lpt87dd2f4yh9azg7jlh",
    "stride10d07y265gmmuvt4z0w9aw880jnsr700jefnezl",
];

/// Decides whether a caller may perform privileged operations
pub trait AuthorizationPolicy: Send + Sync {
    fn authorize(&self, caller: &str) -> bool;
}

/// Fixed set of privileged addresses
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    admins: BTreeSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    /// Allow-list built from `DEFAULT_ADMINS`
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_ADMINS)
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl AuthorizationPolicy for AdminAllowList {
    fn authorize(&self, caller: &str) -> bool {
        self.admins.contains(caller)
    }
}
