//! Video device adapter: TV power and input selection.

use async_trait::async_trait;
use serde_json::{json, Value};

use fleet_storage::{Device, DeviceKind};

use super::{fetch_status, require_string};
use crate::adapter::{AdapterError, DeviceAdapter};
use crate::http::DeviceHttp;

/// HTTP adapter for video endpoints.
pub struct VideoAdapter {
    http: DeviceHttp,
}

impl VideoAdapter {
    /// Create a video adapter over the given transport.
    pub fn new(http: DeviceHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeviceAdapter for VideoAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Video
    }

    async fn execute(
        &self,
        device: &Device,
        command: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError> {
        match command {
            "power_on" => self.http.post_json(device, "/tv/power_on", None).await,
            "power_off" => self.http.post_json(device, "/tv/power_off", None).await,
            "input" => {
                let source = require_string(payload, "source")?;
                self.http
                    .post_json(device, "/tv/input", Some(&json!({ "source": source })))
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

    fn adapter() -> VideoAdapter {
        VideoAdapter::new(DeviceHttp::new(Duration::from_millis(100)))
    }

    #[tokio::test]
    async fn test_input_requires_source() {
        let device = Device::new("tv-1", DeviceKind::Video, "http://10.0.0.6:1");
        let err = adapter()
            .execute(&device, "input", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let device = Device::new("tv-1", DeviceKind::Video, "http://10.0.0.6:1");
        let err = adapter()
            .execute(&device, "play", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedCommand(_)));
    }
}
