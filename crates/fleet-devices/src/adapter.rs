//! Device adapter seam.
//!
//! One adapter per device kind translates logical commands into concrete
//! network calls. Adapter failures never escape the executing component:
//! the single-device executor folds them into the job's terminal state and
//! the group orchestrator captures them per device.

use async_trait::async_trait;
use serde_json::Value;

use fleet_storage::{Device, DeviceKind};

/// Device adapter error.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Request exceeded the adapter's timeout.
    #[error("request timed out")]
    Timeout,

    /// TCP/TLS connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The device answered with a non-2xx status.
    #[error("device returned HTTP {status}")]
    Http {
        /// Response status code.
        status: u16,
    },

    /// The device has no resolvable base URL.
    #[error("device {0} has no base URL configured")]
    MissingAddress(String),

    /// Command payload failed the adapter's validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The adapter does not know this command.
    #[error("unsupported command {0}")]
    UnsupportedCommand(String),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl AdapterError {
    /// Short classification label for counters and offline reasons.
    pub fn reason(&self) -> &'static str {
        match self {
            AdapterError::Timeout => "timeout",
            AdapterError::Connect(_) => "connect",
            AdapterError::Http { status } if *status >= 500 => "http_5xx",
            AdapterError::Http { .. } => "http_4xx",
            AdapterError::MissingAddress(_) => "no_address",
            AdapterError::InvalidPayload(_) => "invalid_payload",
            AdapterError::UnsupportedCommand(_) => "unsupported_command",
            AdapterError::Transport(_) => "error",
        }
    }

    /// Whether another attempt over the same transport could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::Timeout | AdapterError::Connect(_) | AdapterError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AdapterError::Timeout
        } else if e.is_connect() {
            AdapterError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            AdapterError::Http {
                status: status.as_u16(),
            }
        } else {
            AdapterError::Transport(e.to_string())
        }
    }
}

/// Per-device-kind command adapter.
#[async_trait]
pub trait DeviceAdapter: Send + Sync {
    /// The device kind this adapter serves.
    fn kind(&self) -> DeviceKind;

    /// Execute a logical command against a device.
    ///
    /// Returns the device's response body, if any.
    async fn execute(
        &self,
        device: &Device,
        command: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError>;

    /// Fetch the device's status endpoint.
    async fn status(&self, device: &Device) -> Result<Value, AdapterError>;
}
