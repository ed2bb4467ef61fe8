//! Common Infrastructure Module
//!
//! Shared utilities and configuration for the controller.
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - The root error type

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, ControllerConfig, Network};
pub use error::{ControllerError, Result};
pub use logging::{
    generate_correlation_id, init_from_config, init_logging, log_api_response, log_ledger_event,
    log_provisioning_event, log_registration_event, log_security_event, ErrorDetails,
    EventCategory, LogEvent, LogLevel, LoggingError,
};
