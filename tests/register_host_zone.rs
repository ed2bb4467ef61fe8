//! End-to-end host zone registration through the assembled controller

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use stakeibc::ica::StaticChainResolver;
use stakeibc::storage::{MemoryEpochUnbondingStore, MemoryHostZoneStore};
use stakeibc::{
    AccountProvisioner, App, ControllerConfig, Dec, HostZoneRegistry, HostZoneUnbondingStatus,
    IcaAccountStatus, IcaAccountType, ProvisionError, RegisterHostZoneMsg, RegistrationError,
    DEFAULT_ADMINS,
};

/// Records every request and rejects owners of one role
#[derive(Default)]
struct RecordingProvisioner {
    reject_role: Option<IcaAccountType>,
    owners: Mutex<Vec<String>>,
}

#[async_trait]
impl AccountProvisioner for RecordingProvisioner {
    async fn request_account_creation(
        &self,
        _connection_id: &str,
        owner: &str,
    ) -> Result<(), ProvisionError> {
        self.owners.lock().unwrap().push(owner.to_string());
        match self.reject_role {
            Some(role) if owner.ends_with(role.as_str()) => {
                Err(ProvisionError::Rejected("controller port closed".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn build(provisioner: Arc<RecordingProvisioner>) -> App {
    let mut connections = BTreeMap::new();
    connections.insert("connection-0".to_string(), "cosmoshub-4".to_string());
    connections.insert("connection-1".to_string(), "osmosis-1".to_string());

    App::new(
        ControllerConfig::default(),
        Arc::new(MemoryHostZoneStore::new()),
        Arc::new(MemoryEpochUnbondingStore::new()),
        Arc::new(StaticChainResolver::new(connections)),
        provisioner,
    )
}

fn msg(connection_id: &str, host_denom: &str) -> RegisterHostZoneMsg {
    RegisterHostZoneMsg {
        creator: DEFAULT_ADMINS[1].to_string(),
        connection_id: connection_id.to_string(),
        bech32_prefix: "cosmos".to_string(),
        ibc_denom: format!("ibc/{}", host_denom.to_uppercase()),
        host_denom: host_denom.to_string(),
        transfer_channel_id: "channel-0".to_string(),
        unbonding_frequency: 4,
    }
}

#[tokio::test]
async fn registers_zone_accounts_and_ledger_entry() {
    let provisioner = Arc::new(RecordingProvisioner::default());
    let app = build(provisioner.clone());
    app.start_epoch(1).await.unwrap();

    let response = app
        .orchestrator()
        .register_host_zone(msg("connection-0", "uatom"))
        .await
        .unwrap();
    assert_eq!(response.chain_id, "cosmoshub-4");
    assert_eq!(response.connection_id, "connection-0");

    let zone = app.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
    assert_eq!(zone.host_denom, "uatom");
    assert_eq!(zone.redemption_rate, Dec::one());
    assert_eq!(zone.last_redemption_rate, Dec::one());
    assert!(zone
        .ica_accounts
        .iter()
        .all(|a| a.status == IcaAccountStatus::Requested));

    assert_eq!(
        *provisioner.owners.lock().unwrap(),
        vec![
            "cosmoshub-4.DELEGATION",
            "cosmoshub-4.FEE",
            "cosmoshub-4.WITHDRAWAL",
            "cosmoshub-4.REDEMPTION"
        ]
    );

    let record = app.ledger().latest_record().await.unwrap().unwrap();
    let entry = record.host_zone_unbonding("cosmoshub-4").unwrap();
    assert_eq!(entry.amount, 0);
    assert_eq!(entry.denom, "uatom");
    assert_eq!(entry.status, HostZoneUnbondingStatus::Bonded);
}

#[tokio::test]
async fn second_registration_is_rejected() {
    let app = build(Arc::new(RecordingProvisioner::default()));
    app.start_epoch(1).await.unwrap();

    app.orchestrator()
        .register_host_zone(msg("connection-0", "uatom"))
        .await
        .unwrap();
    let err = app
        .orchestrator()
        .register_host_zone(msg("connection-0", "uatom"))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::DuplicateHostZone(ref id) if id == "cosmoshub-4"));
    assert_eq!(app.registry().all_zones().await.unwrap().len(), 1);
    assert_eq!(
        app.ledger()
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
async fn provisioning_failure_keeps_partial_zone() {
    let failing = Arc::new(RecordingProvisioner {
        reject_role: Some(IcaAccountType::Withdrawal),
        ..Default::default()
    });
    let app = build(failing);
    app.start_epoch(1).await.unwrap();

    let err = app
        .orchestrator()
        .register_host_zone(msg("connection-0", "uatom"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::AccountProvisioning {
            role: IcaAccountType::Withdrawal,
            ..
        }
    ));

    let zone = app.registry().lookup("cosmoshub-4").await.unwrap().unwrap();
    let status = |role| zone.account(role).unwrap().status;
    assert_eq!(status(IcaAccountType::Delegation), IcaAccountStatus::Requested);
    assert_eq!(status(IcaAccountType::Fee), IcaAccountStatus::Requested);
    assert_eq!(status(IcaAccountType::Withdrawal), IcaAccountStatus::Failed);
    assert_eq!(status(IcaAccountType::Redemption), IcaAccountStatus::NotRequested);
    assert!(!app.ledger().latest_record().await.unwrap().unwrap().contains("cosmoshub-4"));
}

#[tokio::test]
async fn missing_epoch_keeps_zone() {
    let app = build(Arc::new(RecordingProvisioner::default()));

    let err = app
        .orchestrator()
        .register_host_zone(msg("connection-1", "uosmo"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrationError::NoActiveEpoch));
    assert!(app.registry().lookup("osmosis-1").await.unwrap().is_some());

    // Once an epoch exists reconciliation backfills the entry
    app.start_epoch(1).await.unwrap();
    let requested = app
        .orchestrator()
        .reconcile_accounts(DEFAULT_ADMINS[0], "osmosis-1")
        .await
        .unwrap();
    assert!(requested.is_empty());
    assert!(app.ledger().latest_record().await.unwrap().unwrap().contains("osmosis-1"));
}

#[tokio::test]
async fn unknown_connection_persists_nothing() {
    let provisioner = Arc::new(RecordingProvisioner::default());
    let app = build(provisioner.clone());
    app.start_epoch(1).await.unwrap();

    let err = app
        .orchestrator()
        .register_host_zone(msg("connection-7", "uatom"))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::ChainResolution { .. }));
    assert!(app.registry().all_zones().await.unwrap().is_empty());
    assert!(provisioner.owners.lock().unwrap().is_empty());
}

#[test]
fn owner_labels_are_deterministic() {
    for role in IcaAccountType::ALL {
        let label = HostZoneRegistry::derive_account_owner_label("cosmoshub-4", role);
        assert_eq!(label, format!("cosmoshub-4.{}", role.as_str()));
        assert_eq!(
            label,
            HostZoneRegistry::derive_account_owner_label("cosmoshub-4", role)
        );
    }
}
