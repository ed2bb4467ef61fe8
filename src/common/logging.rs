//! Structured Logging for the StakeIBC Controller
//!
//! Provides structured logging with:
//! - JSON output for log aggregation on mainnet
//! - Correlation IDs for tracing one registration across its stages
//! - Security event logging for authorization decisions
//!
//! # Usage
//!
//! ```rust,ignore
//! use stakeibc::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true)?; // JSON mode for mainnet
//! tracing::info!(target: "stakeibc::registration", chain_id = %id, "registering");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// API request/response events
    Api,
    /// Host zone registration stages
    Registration,
    /// ICA account provisioning requests and acknowledgements
    Provisioning,
    /// Epoch unbonding ledger writes
    Ledger,
    /// Security events (authorization, validation failures)
    Security,
    /// System events (startup, shutdown)
    System,
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    /// Log level
    pub level: String,
    /// Event category
    pub category: EventCategory,
    /// Human-readable message
    pub message: String,
    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for error events
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: level.as_filter().to_uppercase(),
            category,
            message: message.into(),
            correlation_id: None,
            data: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Add correlation ID
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Add error details
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorDetails {
            code: code.into(),
            message: message.into(),
        });
        self
    }

    /// Render this event as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Domain Event Logging
// ============================================================================

/// Log an authorization decision
pub fn log_security_event(
    event_type: &str,
    success: bool,
    details: serde_json::Value,
    correlation_id: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Warn };
    let mut event = LogEvent::new(level, EventCategory::Security, event_type).with_data(
        serde_json::json!({
            "success": success,
            "details": details
        }),
    );

    if let Some(id) = correlation_id {
        event = event.with_correlation_id(id);
    }

    if success {
        tracing::info!(target: "stakeibc::security", "{}", event.to_json());
    } else {
        tracing::warn!(target: "stakeibc::security", "{}", event.to_json());
    }
}

/// Log a registration stage outcome
pub fn log_registration_event(
    stage: &str,
    connection_id: &str,
    chain_id: Option<&str>,
    correlation_id: &str,
    error: Option<(&str, &str)>,
) {
    let level = if error.is_some() {
        LogLevel::Error
    } else {
        LogLevel::Info
    };
    let mut event = LogEvent::new(level, EventCategory::Registration, stage)
        .with_correlation_id(correlation_id)
        .with_data(serde_json::json!({
            "stage": stage,
            "connection_id": connection_id,
            "chain_id": chain_id,
        }));

    if let Some((code, message)) = error {
        event = event.with_error(code, message);
        tracing::error!(target: "stakeibc::registration", "{}", event.to_json());
    } else {
        tracing::info!(target: "stakeibc::registration", "{}", event.to_json());
    }
}

/// Log an ICA account creation request or acknowledgement
pub fn log_provisioning_event(
    event_type: &str,
    chain_id: &str,
    owner: &str,
    success: bool,
    error: Option<&str>,
) {
    let level = if success { LogLevel::Info } else { LogLevel::Error };
    let mut event = LogEvent::new(level, EventCategory::Provisioning, event_type)
        .with_correlation_id(owner)
        .with_data(serde_json::json!({
            "chain_id": chain_id,
            "owner": owner,
            "success": success
        }));

    if let Some(err) = error {
        event = event.with_error("ACCOUNT_PROVISIONING_ERROR", err);
    }

    if success {
        tracing::info!(target: "stakeibc::provisioning", "{}", event.to_json());
    } else {
        tracing::error!(target: "stakeibc::provisioning", "{}", event.to_json());
    }
}

/// Log an epoch unbonding ledger write or anomaly
pub fn log_ledger_event(
    event_type: &str,
    epoch_id: u64,
    host_zone_id: Option<&str>,
    anomaly: Option<&str>,
) {
    let level = if anomaly.is_some() {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };
    let mut event = LogEvent::new(level, EventCategory::Ledger, event_type).with_data(
        serde_json::json!({
            "epoch_id": epoch_id,
            "host_zone_id": host_zone_id,
        }),
    );

    if let Some(reason) = anomaly {
        event = event.with_error("LEDGER_INSERT_CONFLICT", reason);
        tracing::warn!(target: "stakeibc::ledger", "{}", event.to_json());
    } else {
        tracing::info!(target: "stakeibc::ledger", "{}", event.to_json());
    }
}

/// Log an API response
pub fn log_api_response(method: &str, path: &str, status: u16, duration_ms: u64) {
    let level = if status >= 500 {
        LogLevel::Error
    } else if status >= 400 {
        LogLevel::Warn
    } else {
        LogLevel::Info
    };

    let event = LogEvent::new(
        level,
        EventCategory::Api,
        format!("{} {} -> {}", method, path, status),
    )
    .with_duration(duration_ms)
    .with_data(serde_json::json!({
        "method": method,
        "path": path,
        "status": status
    }));

    match level {
        LogLevel::Error => tracing::error!(target: "stakeibc::api", "{}", event.to_json()),
        LogLevel::Warn => tracing::warn!(target: "stakeibc::api", "{}", event.to_json()),
        _ => tracing::info!(target: "stakeibc::api", "{}", event.to_json()),
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Minimum log level to output
/// * `json_format` - Use JSON format (mainnet)
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_filter();
        EnvFilter::new(format!(
            "stakeibc={},tower_http={},axum={}",
            level, level, level
        ))
    });

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from ControllerConfig
pub fn init_from_config(config: &super::config::ControllerConfig) -> Result<(), LoggingError> {
    let level = LogLevel::from(config.log_level.as_str());
    let json_format = config.network == super::config::Network::Mainnet;

    init_logging(level, json_format)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}

// ============================================================================
// Request ID Generation
// ============================================================================

/// Generate a unique correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(LogLevel::Info, EventCategory::Registration, "persisting-zone")
            .with_correlation_id("reg-123")
            .with_data(serde_json::json!({"chain_id": "cosmoshub-4"}))
            .with_duration(42);

        let json = event.to_json();
        assert!(json.contains("persisting-zone"));
        assert!(json.contains("reg-123"));
        assert!(json.contains("\"registration\""));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_error_details_serialized() {
        let event = LogEvent::new(LogLevel::Warn, EventCategory::Ledger, "insert-entry")
            .with_error("LEDGER_INSERT_CONFLICT", "entry exists");

        let json = event.to_json();
        assert!(json.contains("LEDGER_INSERT_CONFLICT"));
        assert!(json.contains("\"WARN\""));
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let id1 = generate_correlation_id();
        let id2 = generate_correlation_id();

        assert_eq!(id1.len(), 32);
        assert_ne!(id1, id2);
    }
}
