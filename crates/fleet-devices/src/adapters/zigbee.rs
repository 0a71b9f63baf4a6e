//! Zigbee coordinator adapter: pairing, reset, raw publish.

use async_trait::async_trait;
use serde_json::{json, Value};

use fleet_storage::{Device, DeviceKind};

use super::{fetch_status, require_string};
use crate::adapter::{AdapterError, DeviceAdapter};
use crate::http::DeviceHttp;

/// Pairing window length when the payload does not specify one.
const DEFAULT_PERMIT_JOIN_SECS: u64 = 60;

/// HTTP adapter for zigbee coordinator endpoints.
pub struct ZigbeeAdapter {
    http: DeviceHttp,
}

impl ZigbeeAdapter {
    /// Create a zigbee adapter over the given transport.
    pub fn new(http: DeviceHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DeviceAdapter for ZigbeeAdapter {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Zigbee
    }

    async fn execute(
        &self,
        device: &Device,
        command: &str,
        payload: &Value,
    ) -> Result<Value, AdapterError> {
        match command {
            "permit_join" => {
                let duration = payload
                    .get("duration")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_PERMIT_JOIN_SECS);
                self.http
                    .post_json(device, "/permit_join", Some(&json!({ "duration": duration })))
                    .await
            }
            "reset" => self.http.post_json(device, "/reset", None).await,
            "publish" => {
                let topic = require_string(payload, "topic")?;
                let body = json!({
                    "topic": topic,
                    "payload": payload.get("payload").cloned().unwrap_or(Value::Null),
                });
                self.http.post_json(device, "/publish", Some(&body)).await
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

    fn adapter() -> ZigbeeAdapter {
        ZigbeeAdapter::new(DeviceHttp::new(Duration::from_millis(100)))
    }

    #[tokio::test]
    async fn test_publish_requires_topic() {
        let device = Device::new("zb-1", DeviceKind::Zigbee, "http://10.0.0.8:1");
        let err = adapter()
            .execute(&device, "publish", &json!({"payload": {"on": true}}))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let device = Device::new("zb-1", DeviceKind::Zigbee, "http://10.0.0.8:1");
        let err = adapter()
            .execute(&device, "pair", &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedCommand(_)));
    }
}
