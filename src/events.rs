//! Domain Events
//!
//! Events emitted by the controller for external observers and indexers.
//! Live subscribers receive events over a broadcast channel; a bounded
//! history is kept for late joiners and the REST surface.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::types::IcaAccountType;

/// Event category emitted on successful host zone registration
pub const CATEGORY_REGISTER_ZONE: &str = "register-zone";

/// Domain event payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ZoneEvent {
    RegisterZone {
        connection_id: String,
        chain_id: String,
    },
    AccountRequested {
        chain_id: String,
        role: IcaAccountType,
        owner: String,
    },
    AccountOpened {
        chain_id: String,
        role: IcaAccountType,
        address: String,
    },
    AddValidator {
        chain_id: String,
        address: String,
    },
    DeleteValidator {
        chain_id: String,
        address: String,
    },
}

impl ZoneEvent {
    pub fn category(&self) -> &'static str {
        match self {
            ZoneEvent::RegisterZone { .. } => CATEGORY_REGISTER_ZONE,
            ZoneEvent::AccountRequested { .. } => "account-requested",
            ZoneEvent::AccountOpened { .. } => "account-opened",
            ZoneEvent::AddValidator { .. } => "add-validator",
            ZoneEvent::DeleteValidator { .. } => "delete-validator",
        }
    }

    /// Host zone the event concerns
    pub fn chain_id(&self) -> &str {
        match self {
            ZoneEvent::RegisterZone { chain_id, .. }
            | ZoneEvent::AccountRequested { chain_id, .. }
            | ZoneEvent::AccountOpened { chain_id, .. }
            | ZoneEvent::AddValidator { chain_id, .. }
            | ZoneEvent::DeleteValidator { chain_id, .. } => chain_id,
        }
    }
}

/// An emitted event with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    /// RFC 3339
    pub timestamp: String,
    pub category: String,
    pub event: ZoneEvent,
}

impl EventEnvelope {
    pub fn wrap(event: ZoneEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            category: event.category().to_string(),
            event,
        }
    }
}

/// Broadcast bus with bounded history
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    history: Arc<RwLock<VecDeque<EventEnvelope>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Record and broadcast an event
    pub async fn emit(&self, event: ZoneEvent) -> EventEnvelope {
        let envelope = EventEnvelope::wrap(event);

        {
            let mut history = self.history.write().await;
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(envelope.clone());
        }

        // No receivers is fine
        let _ = self.sender.send(envelope.clone());

        tracing::debug!(
            target: "stakeibc::events",
            category = %envelope.category,
            chain_id = %envelope.event.chain_id(),
            "event emitted"
        );

        envelope
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Up to `limit` most recent events, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<EventEnvelope> {
        let history = self.history.read().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// Recent events in one category, oldest first
    pub async fn recent_in_category(&self, category: &str) -> Vec<EventEnvelope> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
