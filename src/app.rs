//! Application Wiring
//!
//! Builds the stores, collaborators and core components from configuration.

use std::sync::Arc;

use crate::auth::AdminAllowList;
use crate::common::{ControllerConfig, ControllerError};
use crate::events::EventBus;
use crate::genesis::{self, GenesisState};
use crate::ica::{
    AccountProvisioner, AccountRequest, ChainResolver, LcdChainResolver, QueuedProvisioner,
    RelayerProvisioner, StaticChainResolver,
};
use crate::records::EpochUnbondingLedger;
use crate::stakeibc::{HostZoneRegistry, RegistrationOrchestrator};
use crate::storage::{
    EpochUnbondingStore, HostZoneStore, MemoryEpochUnbondingStore, MemoryHostZoneStore,
    SqliteStore,
};
use crate::types::EpochUnbondingRecord;

/// The assembled controller
pub struct App {
    config: ControllerConfig,
    orchestrator: Arc<RegistrationOrchestrator>,
    queue: Option<QueuedProvisioner>,
}

impl App {
    /// Build from configuration, importing genesis into empty stores
    pub async fn from_config(config: ControllerConfig) -> Result<Self, ControllerError> {
        let (host_zones, epochs): (Arc<dyn HostZoneStore>, Arc<dyn EpochUnbondingStore>) =
            match &config.database_path {
                Some(path) => {
                    let store = Arc::new(SqliteStore::new(path)?);
                    let host_zones: Arc<dyn HostZoneStore> = store.clone();
                    let epochs: Arc<dyn EpochUnbondingStore> = store;
                    (host_zones, epochs)
                }
                None => {
                    let host_zones: Arc<dyn HostZoneStore> = Arc::new(MemoryHostZoneStore::new());
                    let epochs: Arc<dyn EpochUnbondingStore> =
                        Arc::new(MemoryEpochUnbondingStore::new());
                    (host_zones, epochs)
                }
            };

        let mut resolver = StaticChainResolver::new(config.connections.clone());
        if let Some(lcd_url) = &config.lcd_url {
            resolver = resolver.with_fallback(Arc::new(LcdChainResolver::new(lcd_url)));
        }

        let (provisioner, queue): (Arc<dyn AccountProvisioner>, Option<QueuedProvisioner>) =
            match &config.relayer_url {
                Some(url) => {
                    let relayer: Arc<dyn AccountProvisioner> =
                        Arc::new(RelayerProvisioner::new(url));
                    (relayer, None)
                }
                None => {
                    let queue = QueuedProvisioner::new(config.provisioner_queue_size);
                    let provisioner: Arc<dyn AccountProvisioner> = Arc::new(queue.clone());
                    (provisioner, Some(queue))
                }
            };

        let mut app = Self::new(config, host_zones, epochs, Arc::new(resolver), provisioner);
        app.queue = queue;

        if let Some(path) = app.config.genesis_path.clone() {
            app.import_genesis_if_empty(&GenesisState::load(&path)?)
                .await?;
        }

        Ok(app)
    }

    /// Assemble from explicit collaborators
    pub fn new(
        config: ControllerConfig,
        host_zones: Arc<dyn HostZoneStore>,
        epochs: Arc<dyn EpochUnbondingStore>,
        resolver: Arc<dyn ChainResolver>,
        provisioner: Arc<dyn AccountProvisioner>,
    ) -> Self {
        let registry = Arc::new(HostZoneRegistry::new(host_zones));
        let ledger = Arc::new(EpochUnbondingLedger::new(epochs));
        let policy = Arc::new(AdminAllowList::new(config.admins.clone()));
        let events = EventBus::new(config.event_buffer);

        let orchestrator = Arc::new(RegistrationOrchestrator::new(
            registry,
            ledger,
            resolver,
            provisioner,
            policy,
            events,
        ));

        Self {
            config,
            orchestrator,
            queue: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<RegistrationOrchestrator> {
        &self.orchestrator
    }

    pub fn registry(&self) -> &Arc<HostZoneRegistry> {
        self.orchestrator.registry()
    }

    pub fn ledger(&self) -> &Arc<EpochUnbondingLedger> {
        self.orchestrator.ledger()
    }

    pub fn events(&self) -> &EventBus {
        self.orchestrator.events()
    }

    /// Open a new epoch unbonding record
    pub async fn start_epoch(
        &self,
        epoch_id: u64,
    ) -> Result<EpochUnbondingRecord, ControllerError> {
        Ok(self.ledger().start_epoch(epoch_id).await?)
    }

    /// Account requests waiting in the local queue (empty with a relayer)
    pub async fn queued_requests(&self) -> Vec<AccountRequest> {
        match &self.queue {
            Some(queue) => queue.pending().await,
            None => Vec::new(),
        }
    }

    /// Whether account requests wait in the in-process queue
    pub fn uses_local_queue(&self) -> bool {
        self.queue.is_some()
    }

    /// Hand the queued account requests to an admin for relaying
    ///
    /// Frees queue capacity; the drained roles stay `Requested` until the
    /// acknowledgement path reports them open.
    pub async fn drain_account_requests(
        &self,
        creator: &str,
    ) -> Result<Vec<AccountRequest>, ControllerError> {
        self.orchestrator.authorize(creator, "drain-account-requests")?;

        let drained = match &self.queue {
            Some(queue) => queue.drain().await,
            None => Vec::new(),
        };
        tracing::info!(
            target: "stakeibc::provisioning",
            drained = drained.len(),
            "drained account requests"
        );
        Ok(drained)
    }

    pub async fn export_genesis(&self) -> Result<GenesisState, ControllerError> {
        Ok(genesis::export_genesis(self.registry(), self.ledger()).await?)
    }

    /// Import `state` unless the stores already hold data
    ///
    /// Returns whether the import happened.
    pub async fn import_genesis_if_empty(
        &self,
        state: &GenesisState,
    ) -> Result<bool, ControllerError> {
        let has_zones = !self.registry().all_zones().await?.is_empty();
        let has_epochs = self.ledger().latest_record().await?.is_some();

        if has_zones || has_epochs {
            tracing::info!(target: "stakeibc::genesis", "stores not empty, skipping genesis");
            return Ok(false);
        }

        genesis::init_genesis(state, self.registry(), self.ledger()).await?;
        Ok(true)
    }
}
