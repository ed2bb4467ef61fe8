//! Registration Orchestrator
//!
//! Drives a host zone registration through its stages:
//!
//! ```text
//! ResolvingChain -> CheckingUniqueness -> PersistingZone
//!     -> ProvisioningAccounts(DELEGATION, FEE, WITHDRAWAL, REDEMPTION)
//!     -> UpdatingLedger -> Done
//! ```
//!
//! Any stage may move to `Aborted`. Once `PersistingZone` succeeds the zone
//! stays registered whatever happens afterwards; each account role records
//! its own status on the zone so `reconcile_accounts` can finish the job.
//!
//! All mutating operations hold one write lock, so registrations run one at
//! a time. The persist-time duplicate check is still authoritative.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::RegistrationError;
use super::registry::HostZoneRegistry;
use crate::auth::AuthorizationPolicy;
use crate::common::logging::{
    generate_correlation_id, log_ledger_event, log_provisioning_event, log_registration_event,
    log_security_event,
};
use crate::events::{EventBus, ZoneEvent};
use crate::ica::{AccountProvisioner, ChainResolver};
use crate::records::EpochUnbondingLedger;
use crate::types::{
    unix_now, AddValidatorMsg, DeleteValidatorMsg, HostZone, HostZoneUnbonding, IcaAccountStatus,
    IcaAccountType, RegisterHostZoneMsg, RegisterHostZoneResponse, Validator,
};

/// Registration state machine stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    ResolvingChain,
    CheckingUniqueness,
    PersistingZone,
    ProvisioningAccounts(IcaAccountType),
    UpdatingLedger,
    Done,
    Aborted,
}

impl fmt::Display for RegistrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolvingChain => write!(f, "resolving-chain"),
            Self::CheckingUniqueness => write!(f, "checking-uniqueness"),
            Self::PersistingZone => write!(f, "persisting-zone"),
            Self::ProvisioningAccounts(role) => write!(f, "provisioning-accounts/{}", role),
            Self::UpdatingLedger => write!(f, "updating-ledger"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Per-registration tracing context
struct Attempt<'a> {
    correlation_id: String,
    connection_id: &'a str,
    chain_id: Option<String>,
    stage: RegistrationStage,
}

impl<'a> Attempt<'a> {
    fn new(connection_id: &'a str) -> Self {
        Self {
            correlation_id: generate_correlation_id(),
            connection_id,
            chain_id: None,
            stage: RegistrationStage::ResolvingChain,
        }
    }

    fn enter(&mut self, stage: RegistrationStage) {
        self.stage = stage;
        tracing::info!(
            target: "stakeibc::registration",
            correlation_id = %self.correlation_id,
            connection_id = %self.connection_id,
            chain_id = self.chain_id.as_deref().unwrap_or("-"),
            stage = %stage,
            "entering stage"
        );
    }

    fn abort(&self, err: RegistrationError) -> RegistrationError {
        let stage = self.stage.to_string();
        log_registration_event(
            &format!("{} -> {}", stage, RegistrationStage::Aborted),
            self.connection_id,
            self.chain_id.as_deref(),
            &self.correlation_id,
            Some((err.error_code(), &err.to_string())),
        );
        err
    }
}

pub struct RegistrationOrchestrator {
    registry: Arc<HostZoneRegistry>,
    ledger: Arc<EpochUnbondingLedger>,
    resolver: Arc<dyn ChainResolver>,
    provisioner: Arc<dyn AccountProvisioner>,
    policy: Arc<dyn AuthorizationPolicy>,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl RegistrationOrchestrator {
    pub fn new(
        registry: Arc<HostZoneRegistry>,
        ledger: Arc<EpochUnbondingLedger>,
        resolver: Arc<dyn ChainResolver>,
        provisioner: Arc<dyn AccountProvisioner>,
        policy: Arc<dyn AuthorizationPolicy>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            ledger,
            resolver,
            provisioner,
            policy,
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<HostZoneRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<EpochUnbondingLedger> {
        &self.ledger
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn authorize(&self, caller: &str, action: &str) -> Result<(), RegistrationError> {
        let allowed = self.policy.authorize(caller);
        log_security_event(
            action,
            allowed,
            serde_json::json!({ "caller": caller }),
            None,
        );

        if allowed {
            Ok(())
        } else {
            Err(RegistrationError::Unauthorized(caller.to_string()))
        }
    }

    /// Register the host zone reachable over `msg.connection_id`
    pub async fn register_host_zone(
        &self,
        msg: RegisterHostZoneMsg,
    ) -> Result<RegisterHostZoneResponse, RegistrationError> {
        self.authorize(&msg.creator, "register-host-zone")?;
        msg.validate_basic()?;

        let _guard = self.write_lock.lock().await;
        let mut attempt = Attempt::new(&msg.connection_id);

        // Resolve
        attempt.enter(RegistrationStage::ResolvingChain);
        let chain_id = self
            .resolver
            .resolve_chain_id(&msg.connection_id)
            .await
            .map_err(|source| {
                attempt.abort(RegistrationError::ChainResolution {
                    connection_id: msg.connection_id.clone(),
                    source,
                })
            })?;
        attempt.chain_id = Some(chain_id.clone());

        // Uniqueness
        attempt.enter(RegistrationStage::CheckingUniqueness);
        let existing = self
            .registry
            .lookup(&chain_id)
            .await
            .map_err(|e| attempt.abort(e.into()))?;
        if existing.is_some() {
            return Err(attempt.abort(RegistrationError::DuplicateHostZone(chain_id)));
        }

        // Persist
        attempt.enter(RegistrationStage::PersistingZone);
        let zone = HostZone::new(
            chain_id.clone(),
            msg.connection_id.clone(),
            msg.bech32_prefix.clone(),
            msg.ibc_denom.clone(),
            msg.host_denom.clone(),
            msg.transfer_channel_id.clone(),
            msg.unbonding_frequency,
            unix_now(),
        );
        let zone = self
            .registry
            .register(zone)
            .await
            .map_err(|e| attempt.abort(e.into()))?;

        // Provision, in fixed role order, stopping at the first failure
        for role in IcaAccountType::ALL {
            attempt.enter(RegistrationStage::ProvisioningAccounts(role));
            self.request_account(&zone, role)
                .await
                .map_err(|e| attempt.abort(e))?;
        }

        // Ledger
        attempt.enter(RegistrationStage::UpdatingLedger);
        self.insert_ledger_placeholder(&zone)
            .await
            .map_err(|e| attempt.abort(e))?;

        attempt.enter(RegistrationStage::Done);
        self.events
            .emit(ZoneEvent::RegisterZone {
                connection_id: zone.connection_id.clone(),
                chain_id: zone.chain_id.clone(),
            })
            .await;
        log_registration_event(
            "registered",
            &zone.connection_id,
            Some(&zone.chain_id),
            &attempt.correlation_id,
            None,
        );

        Ok(RegisterHostZoneResponse {
            chain_id: zone.chain_id,
            connection_id: zone.connection_id,
        })
    }

    /// Issue the creation request for one role and record its outcome
    async fn request_account(
        &self,
        zone: &HostZone,
        role: IcaAccountType,
    ) -> Result<(), RegistrationError> {
        let owner = HostZoneRegistry::derive_account_owner_label(&zone.chain_id, role);

        match self
            .provisioner
            .request_account_creation(&zone.connection_id, &owner)
            .await
        {
            Ok(()) => {
                log_provisioning_event("account-requested", &zone.chain_id, &owner, true, None);
                self.registry
                    .mark_account(&zone.chain_id, role, IcaAccountStatus::Requested, None)
                    .await?;
                self.events
                    .emit(ZoneEvent::AccountRequested {
                        chain_id: zone.chain_id.clone(),
                        role,
                        owner,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                log_provisioning_event(
                    "account-requested",
                    &zone.chain_id,
                    &owner,
                    false,
                    Some(&reason),
                );
                if let Err(mark_err) = self
                    .registry
                    .mark_account(
                        &zone.chain_id,
                        role,
                        IcaAccountStatus::Failed,
                        Some(reason.clone()),
                    )
                    .await
                {
                    tracing::warn!(
                        target: "stakeibc::provisioning",
                        chain_id = %zone.chain_id,
                        role = %role,
                        error = %mark_err,
                        "could not record failed account request"
                    );
                }
                Err(RegistrationError::AccountProvisioning { role, reason })
            }
        }
    }

    /// Insert the zero-amount placeholder into the latest epoch
    ///
    /// Returns whether an entry was inserted. An existing entry is logged as
    /// a ledger conflict and left untouched.
    async fn insert_ledger_placeholder(&self, zone: &HostZone) -> Result<bool, RegistrationError> {
        let record = self
            .ledger
            .latest_record()
            .await?
            .ok_or(RegistrationError::NoActiveEpoch)?;

        let entry = HostZoneUnbonding::placeholder(&zone.chain_id, &zone.host_denom);
        let inserted = self
            .ledger
            .insert_host_zone_entry(record.id, &zone.chain_id, entry)
            .await?;

        if !inserted {
            let conflict = RegistrationError::LedgerInsertConflict {
                epoch_id: record.id,
                chain_id: zone.chain_id.clone(),
            };
            log_ledger_event(
                "insert-host-zone-entry",
                record.id,
                Some(&zone.chain_id),
                Some(&conflict.to_string()),
            );
        }

        Ok(inserted)
    }

    /// Re-request every role that was never requested or failed, then make
    /// sure the latest epoch carries an entry for the zone
    ///
    /// Returns the roles requested. Stops at the first failing role.
    pub async fn reconcile_accounts(
        &self,
        creator: &str,
        chain_id: &str,
    ) -> Result<Vec<IcaAccountType>, RegistrationError> {
        self.authorize(creator, "reconcile-accounts")?;

        let _guard = self.write_lock.lock().await;

        let zone = self
            .registry
            .lookup(chain_id)
            .await?
            .ok_or_else(|| RegistrationError::HostZoneNotFound(chain_id.to_string()))?;

        let mut requested = Vec::new();
        for role in zone.pending_roles() {
            self.request_account(&zone, role).await?;
            requested.push(role);
        }

        // An epoch may still be missing; the entry is backfilled on a later run
        if self.ledger.latest_record().await?.is_some()
            && self.insert_ledger_placeholder(&zone).await?
        {
            tracing::info!(
                target: "stakeibc::ledger",
                chain_id = %zone.chain_id,
                "backfilled epoch unbonding entry"
            );
        }

        tracing::info!(
            target: "stakeibc::registration",
            chain_id = %zone.chain_id,
            requested = requested.len(),
            "reconciled accounts"
        );

        Ok(requested)
    }

    /// Acknowledgement path: the account for `role` opened at `address`
    pub async fn acknowledge_account(
        &self,
        chain_id: &str,
        role: IcaAccountType,
        address: &str,
    ) -> Result<HostZone, RegistrationError> {
        let _guard = self.write_lock.lock().await;

        let zone = self
            .registry
            .record_account_opened(chain_id, role, address)
            .await?;

        let owner = HostZoneRegistry::derive_account_owner_label(chain_id, role);
        log_provisioning_event("account-opened", chain_id, &owner, true, None);
        self.events
            .emit(ZoneEvent::AccountOpened {
                chain_id: chain_id.to_string(),
                role,
                address: address.to_string(),
            })
            .await;

        Ok(zone)
    }

    pub async fn add_validator(&self, msg: AddValidatorMsg) -> Result<HostZone, RegistrationError> {
        self.authorize(&msg.creator, "add-validator")?;
        msg.validate_basic()?;

        let _guard = self.write_lock.lock().await;

        let address = msg.validator.address.clone();
        let zone = self
            .registry
            .add_validator(&msg.host_zone, msg.validator)
            .await?;

        self.events
            .emit(ZoneEvent::AddValidator {
                chain_id: msg.host_zone,
                address,
            })
            .await;

        Ok(zone)
    }

    pub async fn delete_validator(
        &self,
        msg: DeleteValidatorMsg,
    ) -> Result<Validator, RegistrationError> {
        self.authorize(&msg.creator, "delete-validator")?;
        msg.validate_basic()?;

        let _guard = self.write_lock.lock().await;

        let removed = self
            .registry
            .remove_validator(&msg.host_zone, &msg.validator_address)
            .await?;

        self.events
            .emit(ZoneEvent::DeleteValidator {
                chain_id: msg.host_zone,
                address: msg.validator_address,
            })
            .await;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminAllowList;
    use crate::events::CATEGORY_REGISTER_ZONE;
    use crate::ica::{MockAccountProvisioner, MockChainResolver, ProvisionError, ResolveError};
    use crate::storage::{
        HostZoneStore, MemoryEpochUnbondingStore, MemoryHostZoneStore, StorageError,
        StorageResult,
    };
    use crate::types::{Dec, HostZoneUnbondingStatus, ValidatorStatus};
    use mockall::Sequence;

    const ADMIN: &str = "stride1admin";

    fn resolver_for(chain_id: &'static str) -> MockChainResolver {
        let mut resolver = MockChainResolver::new();
        resolver
            .expect_resolve_chain_id()
            .withf(|connection_id| connection_id == "connection-0")
            .returning(move |_| Ok(chain_id.to_string()));
        resolver
    }

    fn accepting_provisioner() -> MockAccountProvisioner {
        let mut provisioner = MockAccountProvisioner::new();
        provisioner
            .expect_request_account_creation()
            .returning(|_, _| Ok(()));
        provisioner
    }

    fn orchestrator(
        resolver: MockChainResolver,
        provisioner: MockAccountProvisioner,
    ) -> RegistrationOrchestrator {
        let registry = Arc::new(HostZoneRegistry::new(Arc::new(MemoryHostZoneStore::new())));
        let ledger = Arc::new(EpochUnbondingLedger::new(Arc::new(
            MemoryEpochUnbondingStore::new(),
        )));
        RegistrationOrchestrator::new(
            registry,
            ledger,
            Arc::new(resolver),
            Arc::new(provisioner),
            Arc::new(AdminAllowList::new([ADMIN])),
            EventBus::new(32),
        )
    }

    fn msg() -> RegisterHostZoneMsg {
        RegisterHostZoneMsg {
            creator: ADMIN.to_string(),
            connection_id: "connection-0".to_string(),
            bech32_prefix: "cosmos".to_string(),
            ibc_denom: "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2"
                .to_string(),
            host_denom: "uatom".to_string(),
            transfer_channel_id: "channel-0".to_string(),
            unbonding_frequency: 4,
        }
    }

    #[tokio::test]
    async fn test_register_host_zone() {
        let mut provisioner = MockAccountProvisioner::new();
        let mut seq = Sequence::new();
        for role in IcaAccountType::ALL {
            let expected = format!("cosmoshub-4.{}", role);
            provisioner
                .expect_request_account_creation()
                .withf(move |connection_id, owner| {
                    connection_id == "connection-0" && owner == expected
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        let orch = orchestrator(resolver_for("cosmoshub-4"), provisioner);
        orch.ledger().start_epoch(1).await.unwrap();

        let response = orch.register_host_zone(msg()).await.unwrap();
        assert_eq!(response.chain_id, "cosmoshub-4");
        assert_eq!(response.connection_id, "connection-0");

        let zone = orch.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
        assert_eq!(zone.redemption_rate, Dec::one());
        assert_eq!(zone.last_redemption_rate, Dec::one());
        assert!(zone
            .ica_accounts
            .iter()
            .all(|a| a.status == IcaAccountStatus::Requested));

        let record = orch.ledger().latest_record().await.unwrap().unwrap();
        assert_eq!(record.host_zone_unbondings.len(), 1);
        let entry = record.host_zone_unbonding("cosmoshub-4").unwrap();
        assert_eq!(entry.amount, 0);
        assert_eq!(entry.denom, "uatom");
        assert_eq!(entry.status, HostZoneUnbondingStatus::Bonded);

        let events = orch.events().recent_in_category(CATEGORY_REGISTER_ZONE).await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].event,
            ZoneEvent::RegisterZone {
                connection_id: "connection-0".to_string(),
                chain_id: "cosmoshub-4".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_caller_touches_nothing() {
        let mut resolver = MockChainResolver::new();
        resolver.expect_resolve_chain_id().times(0);
        let mut provisioner = MockAccountProvisioner::new();
        provisioner.expect_request_account_creation().times(0);

        let orch = orchestrator(resolver, provisioner);
        let mut request = msg();
        request.creator = "stride1intruder".to_string();

        let result = orch.register_host_zone(request).await;
        assert!(matches!(result, Err(RegistrationError::Unauthorized(_))));
        assert!(orch.registry().all_zones().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let mut resolver = MockChainResolver::new();
        resolver.expect_resolve_chain_id().times(0);

        let orch = orchestrator(resolver, MockAccountProvisioner::new());
        let mut request = msg();
        request.bech32_prefix = "Cosmos!".to_string();

        let result = orch.register_host_zone(request).await;
        assert!(matches!(result, Err(RegistrationError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_chain_resolution_failure_writes_nothing() {
        let mut resolver = MockChainResolver::new();
        resolver
            .expect_resolve_chain_id()
            .times(1)
            .returning(|id| Err(ResolveError::UnknownConnection(id.to_string())));
        let mut provisioner = MockAccountProvisioner::new();
        provisioner.expect_request_account_creation().times(0);

        let orch = orchestrator(resolver, provisioner);
        orch.ledger().start_epoch(1).await.unwrap();

        let result = orch.register_host_zone(msg()).await;
        assert!(matches!(
            result,
            Err(RegistrationError::ChainResolution { ref connection_id, .. })
                if connection_id == "connection-0"
        ));
        assert!(orch.registry().all_zones().await.unwrap().is_empty());
        assert!(orch
            .ledger()
            .latest_record()
            .await
            .unwrap()
            .unwrap()
            .host_zone_unbondings
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let orch = orchestrator(resolver_for("cosmoshub-4"), accepting_provisioner());
        orch.ledger().start_epoch(1).await.unwrap();

        orch.register_host_zone(msg()).await.unwrap();
        let second = orch.register_host_zone(msg()).await;

        assert!(matches!(
            second,
            Err(RegistrationError::DuplicateHostZone(ref id)) if id == "cosmoshub-4"
        ));
        assert_eq!(orch.registry().all_zones().await.unwrap().len(), 1);
        assert_eq!(
            orch.ledger()
                .latest_record()
                .await
                .unwrap()
                .unwrap()
                .host_zone_unbondings
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration() {
        let mut provisioner = MockAccountProvisioner::new();
        provisioner
            .expect_request_account_creation()
            .times(4)
            .returning(|_, _| Ok(()));

        let orch = orchestrator(resolver_for("cosmoshub-4"), provisioner);
        orch.ledger().start_epoch(1).await.unwrap();

        let (a, b) = tokio::join!(
            orch.register_host_zone(msg()),
            orch.register_host_zone(msg())
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(RegistrationError::DuplicateHostZone(_)))));
        assert_eq!(orch.registry().all_zones().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_withdrawal_failure_keeps_zone() {
        let mut provisioner = MockAccountProvisioner::new();
        provisioner
            .expect_request_account_creation()
            .times(3)
            .returning(|_, owner| {
                if owner.ends_with(".WITHDRAWAL") {
                    Err(ProvisionError::Rejected("channel closed".to_string()))
                } else {
                    Ok(())
                }
            });

        let orch = orchestrator(resolver_for("cosmoshub-4"), provisioner);
        orch.ledger().start_epoch(1).await.unwrap();

        let result = orch.register_host_zone(msg()).await;
        assert!(matches!(
            result,
            Err(RegistrationError::AccountProvisioning {
                role: IcaAccountType::Withdrawal,
                ..
            })
        ));

        // Zone stays registered, partially provisioned
        let zone = orch.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
        let status = |role| zone.account(role).unwrap().status;
        assert_eq!(status(IcaAccountType::Delegation), IcaAccountStatus::Requested);
        assert_eq!(status(IcaAccountType::Fee), IcaAccountStatus::Requested);
        assert_eq!(status(IcaAccountType::Withdrawal), IcaAccountStatus::Failed);
        assert_eq!(status(IcaAccountType::Redemption), IcaAccountStatus::NotRequested);
        assert!(zone
            .account(IcaAccountType::Withdrawal)
            .unwrap()
            .last_error
            .as_deref()
            .unwrap()
            .contains("channel closed"));

        // No ledger entry, no registration event
        let record = orch.ledger().latest_record().await.unwrap().unwrap();
        assert!(!record.contains("cosmoshub-4"));
        assert!(orch
            .events()
            .recent_in_category(CATEGORY_REGISTER_ZONE)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_no_active_epoch_keeps_zone() {
        let orch = orchestrator(resolver_for("cosmoshub-4"), accepting_provisioner());

        let result = orch.register_host_zone(msg()).await;
        assert!(matches!(result, Err(RegistrationError::NoActiveEpoch)));

        let zone = orch.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
        assert!(zone
            .ica_accounts
            .iter()
            .all(|a| a.status == IcaAccountStatus::Requested));
    }

    #[tokio::test]
    async fn test_ledger_conflict_is_not_fatal() {
        let orch = orchestrator(resolver_for("cosmoshub-4"), accepting_provisioner());
        orch.ledger().start_epoch(1).await.unwrap();

        let mut seeded = HostZoneUnbonding::placeholder("cosmoshub-4", "uatom");
        seeded.amount = 77;
        assert!(orch
            .ledger()
            .insert_host_zone_entry(1, "cosmoshub-4", seeded)
            .await
            .unwrap());

        let response = orch.register_host_zone(msg()).await.unwrap();
        assert_eq!(response.chain_id, "cosmoshub-4");

        let record = orch.ledger().get_record(1).await.unwrap().unwrap();
        assert_eq!(record.host_zone_unbondings.len(), 1);
        assert_eq!(record.host_zone_unbonding("cosmoshub-4").unwrap().amount, 77);
    }

    #[tokio::test]
    async fn test_reconcile_requests_only_missing_roles() {
        let mut provisioner = MockAccountProvisioner::new();
        let mut seq = Sequence::new();
        // Registration fails on WITHDRAWAL, reconciliation finishes the rest
        let calls = [
            ("cosmoshub-4.DELEGATION", true),
            ("cosmoshub-4.FEE", true),
            ("cosmoshub-4.WITHDRAWAL", false),
            ("cosmoshub-4.WITHDRAWAL", true),
            ("cosmoshub-4.REDEMPTION", true),
        ];
        for (expected, accept) in calls {
            provisioner
                .expect_request_account_creation()
                .withf(move |_, owner| owner == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| {
                    if accept {
                        Ok(())
                    } else {
                        Err(ProvisionError::QueueFull)
                    }
                });
        }

        let orch = orchestrator(resolver_for("cosmoshub-4"), provisioner);
        orch.ledger().start_epoch(1).await.unwrap();

        assert!(orch.register_host_zone(msg()).await.is_err());

        let requested = orch.reconcile_accounts(ADMIN, "cosmoshub-4").await.unwrap();
        assert_eq!(
            requested,
            vec![IcaAccountType::Withdrawal, IcaAccountType::Redemption]
        );

        let zone = orch.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
        assert!(zone.pending_roles().is_empty());

        let record = orch.ledger().latest_record().await.unwrap().unwrap();
        assert!(record.contains("cosmoshub-4"));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_zone() {
        let orch = orchestrator(MockChainResolver::new(), MockAccountProvisioner::new());
        let result = orch.reconcile_accounts(ADMIN, "juno-1").await;
        assert!(matches!(result, Err(RegistrationError::HostZoneNotFound(_))));
    }

    #[tokio::test]
    async fn test_acknowledge_account() {
        let orch = orchestrator(resolver_for("cosmoshub-4"), accepting_provisioner());
        orch.ledger().start_epoch(1).await.unwrap();
        orch.register_host_zone(msg()).await.unwrap();

        for role in IcaAccountType::ALL {
            let address = format!("cosmos1{}", role.as_str().to_lowercase());
            orch.acknowledge_account("cosmoshub-4", role, &address)
                .await
                .unwrap();
        }

        let zone = orch.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
        assert!(zone.is_fully_provisioned());
        assert_eq!(
            zone.account(IcaAccountType::Fee).unwrap().address.as_deref(),
            Some("cosmos1fee")
        );
    }

    #[tokio::test]
    async fn test_validator_admin_operations() {
        let orch = orchestrator(resolver_for("cosmoshub-4"), accepting_provisioner());
        orch.ledger().start_epoch(1).await.unwrap();
        orch.register_host_zone(msg()).await.unwrap();

        let validator = Validator {
            name: "cosmostation".to_string(),
            address: "cosmosvaloper1clpqr4nrk4khgkxj78fcwwh6dl3uw4epsluffn".to_string(),
            status: ValidatorStatus::Active,
            commission_rate: 5,
            delegation_amount: 0,
        };

        let denied = orch
            .add_validator(AddValidatorMsg {
                creator: "stride1intruder".to_string(),
                host_zone: "cosmoshub-4".to_string(),
                validator: validator.clone(),
            })
            .await;
        assert!(matches!(denied, Err(RegistrationError::Unauthorized(_))));

        let zone = orch
            .add_validator(AddValidatorMsg {
                creator: ADMIN.to_string(),
                host_zone: "cosmoshub-4".to_string(),
                validator: validator.clone(),
            })
            .await
            .unwrap();
        assert_eq!(zone.validators.len(), 1);

        let removed = orch
            .delete_validator(DeleteValidatorMsg {
                creator: ADMIN.to_string(),
                host_zone: "cosmoshub-4".to_string(),
                validator_address: validator.address.clone(),
            })
            .await
            .unwrap();
        assert_eq!(removed.name, "cosmostation");
    }

    /// Accepts inserts but fails every later write
    struct UpdateFailingStore(MemoryHostZoneStore);

    #[async_trait::async_trait]
    impl HostZoneStore for UpdateFailingStore {
        async fn get(&self, chain_id: &str) -> StorageResult<Option<HostZone>> {
            self.0.get(chain_id).await
        }

        async fn insert(&self, zone: &HostZone) -> StorageResult<()> {
            self.0.insert(zone).await
        }

        async fn update(&self, _zone: &HostZone) -> StorageResult<()> {
            Err(StorageError::Connection("database unavailable".to_string()))
        }

        async fn list(&self) -> StorageResult<Vec<HostZone>> {
            self.0.list().await
        }

        async fn delete(&self, chain_id: &str) -> StorageResult<bool> {
            self.0.delete(chain_id).await
        }
    }

    #[tokio::test]
    async fn test_provisioning_error_survives_status_write_failure() {
        let mut provisioner = MockAccountProvisioner::new();
        provisioner
            .expect_request_account_creation()
            .times(1)
            .returning(|_, _| Err(ProvisionError::Rejected("channel closed".to_string())));

        let store = Arc::new(UpdateFailingStore(MemoryHostZoneStore::new()));
        let orch = RegistrationOrchestrator::new(
            Arc::new(HostZoneRegistry::new(store.clone())),
            Arc::new(EpochUnbondingLedger::new(Arc::new(
                MemoryEpochUnbondingStore::new(),
            ))),
            Arc::new(resolver_for("cosmoshub-4")),
            Arc::new(provisioner),
            Arc::new(AdminAllowList::new([ADMIN])),
            EventBus::new(32),
        );

        let err = orch.register_host_zone(msg()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::AccountProvisioning {
                role: IcaAccountType::Delegation,
                ref reason,
            } if reason.contains("channel closed")
        ));
        assert!(err.leaves_partial_state());

        // The zone itself was persisted before provisioning
        let zone = store.get("cosmoshub-4").await.unwrap().unwrap();
        assert_eq!(
            zone.account(IcaAccountType::Delegation).unwrap().status,
            IcaAccountStatus::NotRequested
        );
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RegistrationStage::ResolvingChain.to_string(), "resolving-chain");
        assert_eq!(
            RegistrationStage::ProvisioningAccounts(IcaAccountType::Fee).to_string(),
            "provisioning-accounts/FEE"
        );
    }
}
