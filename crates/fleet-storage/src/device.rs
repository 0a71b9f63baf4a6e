//! Device model.
//!
//! Devices are owned by the external persistence layer and read-only to
//! the orchestration core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device kinds managed by the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Audio endpoints (playback, volume).
    Audio,
    /// Video endpoints (TV power, input selection).
    Video,
    /// Camera endpoints (reboot, stream probe).
    Camera,
    /// Zigbee coordinators (permit join, reset, publish).
    Zigbee,
}

impl DeviceKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Audio => "audio",
            DeviceKind::Video => "video",
            DeviceKind::Camera => "camera",
            DeviceKind::Zigbee => "zigbee",
        }
    }

    /// All known kinds.
    pub const ALL: &'static [DeviceKind] = &[
        DeviceKind::Audio,
        DeviceKind::Video,
        DeviceKind::Camera,
        DeviceKind::Zigbee,
    ];
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network address of a device.
///
/// A device without a `base_url` is unreachable and skipped by the poller
/// and adapters. The bearer token can be inline (`token`) or named through
/// an environment variable (`token_env`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Base URL of the device HTTP endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Device-declared health path, probed before the fixed fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_path: Option<String>,
    /// Status endpoint path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_path: Option<String>,
    /// Optional metrics endpoint path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    /// Inline bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Name of an environment variable holding the bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl DeviceAddress {
    /// Address with only a base URL set.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }
}

/// A managed or unmanaged fleet device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Device kind, selects the adapter.
    pub kind: DeviceKind,
    /// Network address.
    pub address: DeviceAddress,
    /// Capability descriptor (opaque to the core).
    #[serde(default)]
    pub capabilities: Value,
    /// Whether the health poller touches this device.
    pub managed: bool,
}

impl Device {
    /// Create a managed device with the given kind and base URL.
    pub fn new(id: impl Into<String>, kind: DeviceKind, base_url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            address: DeviceAddress::with_base_url(base_url),
            capabilities: Value::Null,
            managed: true,
        }
    }
}
