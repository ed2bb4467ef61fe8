//! Chain ID Resolution
//!
//! Maps a connection id on the controller chain to the chain id of the
//! counterparty. The chain id is never taken from the caller.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    #[error("invalid client state for {0}: {1}")]
    InvalidClientState(String, String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Resolves the counterparty chain id behind a connection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainResolver: Send + Sync {
    async fn resolve_chain_id(&self, connection_id: &str) -> Result<String, ResolveError>;
}

/// Resolver backed by a fixed connection map, with an optional fallback
#[derive(Clone, Default)]
pub struct StaticChainResolver {
    connections: BTreeMap<String, String>,
    fallback: Option<Arc<dyn ChainResolver>>,
}

impl StaticChainResolver {
    pub fn new(connections: BTreeMap<String, String>) -> Self {
        Self {
            connections,
            fallback: None,
        }
    }

    /// Consult `fallback` for connections missing from the map
    pub fn with_fallback(mut self, fallback: Arc<dyn ChainResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn insert(&mut self, connection_id: impl Into<String>, chain_id: impl Into<String>) {
        self.connections.insert(connection_id.into(), chain_id.into());
    }
}

#[async_trait]
impl ChainResolver for StaticChainResolver {
    async fn resolve_chain_id(&self, connection_id: &str) -> Result<String, ResolveError> {
        if let Some(chain_id) = self.connections.get(connection_id) {
            return Ok(chain_id.clone());
        }

        match &self.fallback {
            Some(fallback) => fallback.resolve_chain_id(connection_id).await,
            None => Err(ResolveError::UnknownConnection(connection_id.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConnectionClientStateResponse {
    identified_client_state: Option<IdentifiedClientState>,
}

#[derive(Debug, Deserialize)]
struct IdentifiedClientState {
    client_state: Option<ClientState>,
}

#[derive(Debug, Deserialize)]
struct ClientState {
    chain_id: Option<String>,
}

/// Extract the counterparty chain id from a connection client state response
fn parse_client_state_chain_id(connection_id: &str, body: &str) -> Result<String, ResolveError> {
    let invalid = |reason: &str| {
        ResolveError::InvalidClientState(connection_id.to_string(), reason.to_string())
    };

    let response: ConnectionClientStateResponse =
        serde_json::from_str(body).map_err(|e| invalid(&e.to_string()))?;

    let chain_id = response
        .identified_client_state
        .and_then(|s| s.client_state)
        .and_then(|s| s.chain_id)
        .ok_or_else(|| invalid("missing client_state.chain_id"))?;

    if chain_id.trim().is_empty() {
        return Err(invalid("empty chain id"));
    }

    Ok(chain_id)
}

/// Resolver querying the controller chain's LCD for the connection's client state
#[derive(Debug, Clone)]
pub struct LcdChainResolver {
    client: Client,
    base_url: String,
}

impl LcdChainResolver {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChainResolver for LcdChainResolver {
    async fn resolve_chain_id(&self, connection_id: &str) -> Result<String, ResolveError> {
        let url = format!(
            "{}/ibc/core/connection/v1/connections/{}/client_state",
            self.base_url, connection_id
        );
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ResolveError::UnknownConnection(connection_id.to_string()));
        }

        let body = resp.text().await?;
        parse_client_state_chain_id(connection_id, &body)
    }
}
