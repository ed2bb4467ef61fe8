//! Environment-based Configuration for the StakeIBC Controller
//!
//! Configuration is loaded from environment variables (after `.env` loading
//! in the binary). Nothing that differs between deployments is hard-coded.
//!
//! # Environment Variables
//!
//! ## Network
//! - `STAKEIBC_NETWORK` - "mainnet", "testnet", or "localnet" (default: "localnet")
//! - `STAKEIBC_API_PORT` - REST API port (default: 3001)
//!
//! ## Storage
//! - `STAKEIBC_DB_PATH` - SQLite database file; unset means in-memory stores
//! - `STAKEIBC_GENESIS` - Genesis JSON imported on startup when the store is empty
//!
//! ## Authorization
//! - `STAKEIBC_ADMINS` - Comma-separated admin addresses (default: built-in list,
//!   refused on mainnet)
//!
//! ## Host Chains
//! - `STAKEIBC_CONNECTIONS` - Static map, e.g. "connection-0=cosmoshub-4,connection-1=osmosis-1"
//! - `STAKEIBC_LCD_URL` - Controller chain LCD endpoint used to resolve unknown connections
//! - `STAKEIBC_ICA_RELAYER_URL` - Relayer endpoint receiving account creation requests;
//!   required outside localnet. Unset on localnet means requests wait in an
//!   in-process queue until drained through `POST /api/account-requests/drain`
//!
//! ## Optional Settings
//! - `STAKEIBC_PROVISIONER_QUEUE_SIZE` - Max queued account requests (default: 1024)
//! - `STAKEIBC_EVENT_BUFFER` - Domain event buffer and history size (default: 256)
//! - `STAKEIBC_LOG_LEVEL` - Logging level (debug, info, warn, error)

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::DEFAULT_ADMINS;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("network mismatch: expected {0}, got {1}")]
    NetworkMismatch(String, String),

    #[error("default admin list not allowed on {0}")]
    DefaultAdminsNotAllowed(String),
}

/// Network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Localnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "localnet" | "local" => Ok(Network::Localnet),
            _ => Err(ConfigError::InvalidValue(
                "STAKEIBC_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Whether the built-in admin allow-list may be used
    pub fn allows_default_admins(&self) -> bool {
        matches!(self, Network::Localnet | Network::Testnet)
    }

    /// Whether account requests may wait in the in-process queue
    pub fn allows_local_queue(&self) -> bool {
        matches!(self, Network::Localnet)
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Network environment
    pub network: Network,

    /// REST API port
    pub api_port: u16,

    /// SQLite database path
    pub database_path: Option<PathBuf>,

    /// Genesis file imported into empty stores
    pub genesis_path: Option<PathBuf>,

    /// Addresses allowed to perform admin operations
    pub admins: Vec<String>,

    /// Known connection id -> chain id mappings
    pub connections: BTreeMap<String, String>,

    /// LCD endpoint for connection lookups
    pub lcd_url: Option<String>,

    /// Relayer endpoint for ICA account requests
    pub relayer_url: Option<String>,

    /// Max queued account requests
    pub provisioner_queue_size: usize,

    /// Event buffer capacity
    pub event_buffer: usize,

    /// Log level
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            network: Network::Localnet,
            api_port: 3001,
            database_path: None,
            genesis_path: None,
            admins: DEFAULT_ADMINS.iter().map(|a| a.to_string()).collect(),
            connections: BTreeMap::new(),
            lcd_url: None,
            relayer_url: None,
            provisioner_queue_size: 1024,
            event_buffer: 256,
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let network: Network = lookup("STAKEIBC_NETWORK")
            .unwrap_or_else(|| "localnet".to_string())
            .parse()?;

        let api_port = parse_or(
            "STAKEIBC_API_PORT",
            lookup("STAKEIBC_API_PORT"),
            defaults.api_port,
        )?;

        let database_path = lookup("STAKEIBC_DB_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let genesis_path = lookup("STAKEIBC_GENESIS")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let admins = match lookup("STAKEIBC_ADMINS") {
            Some(raw) => {
                let admins = parse_list(&raw);
                if admins.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "STAKEIBC_ADMINS".to_string(),
                        "at least one admin address required".to_string(),
                    ));
                }
                admins
            }
            None => defaults.admins,
        };

        let connections = match lookup("STAKEIBC_CONNECTIONS") {
            Some(raw) => parse_connections(&raw)?,
            None => BTreeMap::new(),
        };

        let lcd_url = lookup("STAKEIBC_LCD_URL").filter(|u| !u.trim().is_empty());
        let relayer_url = lookup("STAKEIBC_ICA_RELAYER_URL").filter(|u| !u.trim().is_empty());

        let provisioner_queue_size = parse_or(
            "STAKEIBC_PROVISIONER_QUEUE_SIZE",
            lookup("STAKEIBC_PROVISIONER_QUEUE_SIZE"),
            defaults.provisioner_queue_size,
        )?;

        let event_buffer = parse_or(
            "STAKEIBC_EVENT_BUFFER",
            lookup("STAKEIBC_EVENT_BUFFER"),
            defaults.event_buffer,
        )?;
        if event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "STAKEIBC_EVENT_BUFFER".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let log_level = lookup("STAKEIBC_LOG_LEVEL").unwrap_or(defaults.log_level);

        let config = Self {
            network,
            api_port,
            database_path,
            genesis_path,
            admins,
            connections,
            lcd_url,
            relayer_url,
            provisioner_queue_size,
            event_buffer,
            log_level,
        };

        if !network.allows_default_admins() && config.uses_default_admins() {
            return Err(ConfigError::DefaultAdminsNotAllowed(format!("{:?}", network)));
        }

        if !network.allows_local_queue() && config.relayer_url.is_none() {
            return Err(ConfigError::MissingEnvVar("STAKEIBC_ICA_RELAYER_URL".to_string()));
        }

        Ok(config)
    }

    /// Whether the admin list is the built-in default
    pub fn uses_default_admins(&self) -> bool {
        self.admins.len() == DEFAULT_ADMINS.len()
            && self
                .admins
                .iter()
                .all(|a| DEFAULT_ADMINS.contains(&a.as_str()))
    }

    /// Validate configuration for production readiness
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.network != Network::Mainnet {
            return Err(ConfigError::NetworkMismatch(
                "mainnet".to_string(),
                format!("{:?}", self.network),
            ));
        }

        if self.uses_default_admins() {
            return Err(ConfigError::DefaultAdminsNotAllowed("mainnet".to_string()));
        }

        if self.database_path.is_none() {
            return Err(ConfigError::MissingEnvVar("STAKEIBC_DB_PATH".to_string()));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== StakeIBC Controller Configuration ===");
        println!("Network: {:?}", self.network);
        println!("API Port: {}", self.api_port);
        println!(
            "Database: {}",
            self.database_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in-memory".to_string())
        );
        println!("Admins: {}", self.admins.len());
        println!("Static Connections: {}", self.connections.len());
        println!("LCD: {}", self.lcd_url.as_deref().unwrap_or("disabled"));
        println!(
            "ICA Relayer: {}",
            self.relayer_url.as_deref().unwrap_or("local queue")
        );
        println!("Log Level: {}", self.log_level);
        println!("=========================================");
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), value.clone())),
        None => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse "connection-0=cosmoshub-4,connection-1=osmosis-1"
fn parse_connections(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut connections = BTreeMap::new();

    for pair in parse_list(raw) {
        let (connection_id, chain_id) = pair.split_once('=').ok_or_else(|| {
            ConfigError::InvalidValue(
                "STAKEIBC_CONNECTIONS".to_string(),
                format!("expected connection=chain, got {}", pair),
            )
        })?;

        let (connection_id, chain_id) = (connection_id.trim(), chain_id.trim());
        if connection_id.is_empty() || chain_id.is_empty() {
            return Err(ConfigError::InvalidValue(
                "STAKEIBC_CONNECTIONS".to_string(),
                format!("empty side in {}", pair),
            ));
        }

        connections.insert(connection_id.to_string(), chain_id.to_string());
    }

    Ok(connections)
}
