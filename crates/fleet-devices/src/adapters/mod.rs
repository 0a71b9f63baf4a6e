//! Per-kind device adapters.
//!
//! Each adapter maps the logical commands of its device kind onto the
//! device's HTTP surface and validates command payloads before any network
//! call is made.

mod audio;
mod camera;
mod video;
mod zigbee;

pub use audio::AudioAdapter;
pub use camera::CameraAdapter;
pub use video::VideoAdapter;
pub use zigbee::ZigbeeAdapter;

use serde_json::Value;

use fleet_storage::Device;

use crate::adapter::AdapterError;
use crate::address;
use crate::http::DeviceHttp;

/// Fetch a device's status endpoint.
pub(crate) async fn fetch_status(http: &DeviceHttp, device: &Device) -> Result<Value, AdapterError> {
    http.get_json(device, &address::status_path(&device.address))
        .await
}

/// Extract a required string field from a command payload.
pub(crate) fn require_string(payload: &Value, field: &str) -> Result<String, AdapterError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| AdapterError::InvalidPayload(format!("{field} required")))
}

/// Extract a required numeric field from a command payload.
pub(crate) fn require_number(payload: &Value, field: &str) -> Result<f64, AdapterError> {
    payload
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| AdapterError::InvalidPayload(format!("{field} required")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_string() {
        assert_eq!(
            require_string(&json!({"fileId": "f1"}), "fileId").unwrap(),
            "f1"
        );
        assert!(require_string(&json!({"fileId": "  "}), "fileId").is_err());
        assert!(require_string(&json!({}), "fileId").is_err());
        assert!(require_string(&json!({"fileId": 3}), "fileId").is_err());
    }

    #[test]
    fn test_require_number() {
        assert_eq!(require_number(&json!({"value": 40}), "value").unwrap(), 40.0);
        assert!(require_number(&json!({"value": "40"}), "value").is_err());
        assert!(require_number(&Value::Null, "value").is_err());
    }
}
