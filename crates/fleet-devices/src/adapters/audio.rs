//! Audio device adapter: playback control and volume.

use async_trait::async_trait;
use serde_json::{json, Value};

use fleet_storage::{Device, DeviceKind};

use super::{fetch_status, require_number, require_string};
use crate::adapter::{AdapterError, DeviceAdapter};
use crate::http::DeviceHttp;

/// HTTP adapter for audio endpoints.
pub struct AudioAdapter {
    http: DeviceHttp,
}

impl AudioAdapter {
    /// Create an audio adapter over the given transport.
    pub fn new(http: DeviceHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeviceAdapter for AudioAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Audio
    }

    async fn execute(
        &self,
        device: &Device,
        command: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError> {
        match command {
            "play" => {
                let file = require_string(payload, "fileId")?;
                self.http
                    .post_json(device, "/play", Some(&json!({ "file": file })))
                    .await
            }
            "pause" => self.http.post_json(device, "/pause", None).await,
            "stop" => self.http.post_json(device, "/stop", None).await,
            "volume" => {
                let value = require_number(payload, "value")?;
                self.http
                    .post_json(device, "/volume", Some(&json!({ "value": value })))
                    .await
            }
            other => Err(AdapterError::UnsupportedCommand(other.to_string())),
        }
    }

    async fn status(&self, device: &Device) -> Result<Value, AdapterError> {
        fetch_status(&self.http, device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn adapter() -> AudioAdapter {
        AudioAdapter::new(DeviceHttp::new(Duration::from_millis(100)))
    }

    fn device() -> Device {
        Device::new("amp-1", DeviceKind::Audio, "http://10.0.0.5:1")
    }

    #[tokio::test]
    async fn test_play_requires_file_id() {
        let err = adapter()
            .execute(&device(), "play", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_volume_requires_numeric_value() {
        let err = adapter()
            .execute(&device(), "volume", &json!({"value": "loud"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_unknown_command_rejected_before_network() {
        let mut device = device();
        device.address.base_url = None;
        let err = adapter()
            .execute(&device, "transmogrify", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedCommand(_)));
    }

    #[tokio::test]
    async fn test_missing_base_url_is_reported() {
        let mut device = device();
        device.address.base_url = None;
        let err = adapter()
            .execute(&device, "stop", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::MissingAddress(_)));
    }
}
