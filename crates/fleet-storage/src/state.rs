//! Device state snapshots.
//!
//! The poller writes one merged snapshot per device per cycle. Patches
//! merge into the existing snapshot rather than replacing it, so fields
//! written by earlier cycles survive until overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest known health/status snapshot of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStateSnapshot {
    /// Device identifier.
    pub device_id: String,
    /// `online` / `offline` / `unknown`.
    pub status: String,
    /// Last successful liveness probe.
    pub last_seen: Option<DateTime<Utc>>,
    /// Short reason label when offline.
    pub offline_reason: Option<String>,
    /// Merged state payload (status endpoint data, probe diagnostics).
    pub state: Value,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl DeviceStateSnapshot {
    /// Empty snapshot in `unknown` status.
    pub fn unknown(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            status: "unknown".to_string(),
            last_seen: None,
            offline_reason: None,
            state: Value::Object(Default::default()),
            updated_at: Utc::now(),
        }
    }
}

/// Snapshot metadata accompanying a state patch.
#[derive(Debug, Clone, Default)]
pub struct StateMeta {
    /// New status, or `None` to keep the current one.
    pub status: Option<String>,
    /// New last-seen stamp, or `None` to keep the current one.
    pub last_seen: Option<DateTime<Utc>>,
    /// Offline reason; cleared automatically when status is `online`.
    pub offline_reason: Option<String>,
}

impl StateMeta {
    /// Metadata marking the device online at the given instant.
    pub fn online(last_seen: DateTime<Utc>) -> Self {
        Self {
            status: Some("online".to_string()),
            last_seen: Some(last_seen),
            offline_reason: None,
        }
    }

    /// Metadata marking the device offline with a reason label.
    pub fn offline(reason: impl Into<String>) -> Self {
        Self {
            status: Some("offline".to_string()),
            last_seen: None,
            offline_reason: Some(reason.into()),
        }
    }
}

/// Recursively merge `patch` into `target`.
///
/// Objects merge key-by-key, arrays replace wholesale, scalars overwrite.
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    match (target, patch) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                let entry = merged.remove(key);
                merged.insert(
                    key.clone(),
                    match entry {
                        Some(existing) => merge_patch(&existing, value),
                        None => value.clone(),
                    },
                );
            }
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    }
}
