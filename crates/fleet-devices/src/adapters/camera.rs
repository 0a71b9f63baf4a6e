//! Camera device adapter: reboot and stream probing.

use async_trait::async_trait;
use serde_json::Value;

use fleet_storage::{Device, DeviceKind};

use super::fetch_status;
use crate::adapter::{AdapterError, DeviceAdapter};
use crate::http::DeviceHttp;

/// HTTP adapter for camera endpoints.
pub struct CameraAdapter {
    http: DeviceHttp,
}

impl CameraAdapter {
    /// Create a camera adapter over the given transport.
    pub fn new(http: DeviceHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeviceAdapter for CameraAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Camera
    }

    async fn execute(
        &self,
        device: &Device,
        command: &str,
        _payload: &Value,
    ) -> Result<Value, AdapterError> {
        match command {
            "reboot" => self.http.post_json(device, "/reboot", None).await,
            // Probe returns the negotiated stream descriptor (rtsp/hls
            // urls, resolution, fps, codec).
            "probe" => self.http.post_json(device, "/probe", None).await,
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

    #[tokio::test]
    async fn test_unknown_command() {
        let adapter = CameraAdapter::new(DeviceHttp::new(Duration::from_millis(100)));
        let device = Device::new("cam-1", DeviceKind::Camera, "http://10.0.0.7:1");
        let err = adapter
            .execute(&device, "power_on", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedCommand(_)));
    }
}
