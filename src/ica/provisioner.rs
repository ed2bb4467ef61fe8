//! Remote Account Provisioner
//!
//! Issues interchain account creation requests. A request is an enqueue: the
//! account actually opening on the host chain is reported later through the
//! acknowledgement path (`HostZoneRegistry::record_account_opened`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Provisioning errors
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("provisioning queue is full")]
    QueueFull,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Requests creation of a custodial account on a foreign chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Enqueue account creation for `owner` over `connection_id`
    async fn request_account_creation(
        &self,
        connection_id: &str,
        owner: &str,
    ) -> Result<(), ProvisionError>;
}

/// A queued account creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    pub id: String,
    pub connection_id: String,
    pub owner: String,
    pub requested_at: u64,
}

impl AccountRequest {
    pub fn new(connection_id: &str, owner: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: connection_id.to_string(),
            owner: owner.to_string(),
            requested_at: crate::types::unix_now(),
        }
    }
}

/// In-process queue of account creation requests
///
/// Used on localnet when no relayer is configured; an admin drains it through
/// `App::drain_account_requests` and relays the requests.
#[derive(Clone)]
pub struct QueuedProvisioner {
    requests: Arc<RwLock<VecDeque<AccountRequest>>>,
    max_size: usize,
}

impl QueuedProvisioner {
    pub fn new(max_size: usize) -> Self {
        Self {
            requests: Arc::new(RwLock::new(VecDeque::new())),
            max_size,
        }
    }

    /// Pending requests in arrival order
    pub async fn pending(&self) -> Vec<AccountRequest> {
        self.requests.read().await.iter().cloned().collect()
    }

    /// Remove and return all pending requests
    pub async fn drain(&self) -> Vec<AccountRequest> {
        self.requests.write().await.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }
}

#[async_trait]
impl AccountProvisioner for QueuedProvisioner {
    async fn request_account_creation(
        &self,
        connection_id: &str,
        owner: &str,
    ) -> Result<(), ProvisionError> {
        let mut requests = self.requests.write().await;

        if requests.len() >= self.max_size {
            return Err(ProvisionError::QueueFull);
        }

        requests.push_back(AccountRequest::new(connection_id, owner));
        Ok(())
    }
}

#[derive(Serialize)]
struct RegisterAccountBody<'a> {
    connection_id: &'a str,
    owner: &'a str,
}

/// Forwards account creation requests to a relayer over HTTP
#[derive(Debug, Clone)]
pub struct RelayerProvisioner {
    client: Client,
    base_url: String,
}

impl RelayerProvisioner {
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
impl AccountProvisioner for RelayerProvisioner {
    async fn request_account_creation(
        &self,
        connection_id: &str,
        owner: &str,
    ) -> Result<(), ProvisionError> {
        let url = format!("{}/ica/register", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&RegisterAccountBody {
                connection_id,
                owner,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(ProvisionError::Rejected(format!("{}: {}", status, error_text)));
        }

        Ok(())
    }
}
