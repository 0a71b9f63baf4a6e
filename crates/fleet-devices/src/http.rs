//! HTTP transport shared by the device adapters.
//!
//! Every request carries a fixed timeout and an optional short ladder of
//! retry delays for transient transport failures. Non-2xx responses are
//! surfaced as adapter errors without retrying; the device answered, it
//! just refused.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use fleet_storage::Device;

use crate::adapter::AdapterError;
use crate::address;

/// Retry delays used for device commands (probes use none).
pub const COMMAND_RETRY_DELAYS: [Duration; 2] =
    [Duration::from_millis(500), Duration::from_millis(1000)];

/// Thin reqwest wrapper with per-device URL and credential resolution.
#[derive(Clone)]
pub struct DeviceHttp {
    client: Client,
    timeout: Duration,
    retry_delays: Vec<Duration>,
}

impl DeviceHttp {
    /// Transport with the given request timeout and no retries.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
            retry_delays: Vec::new(),
        }
    }

    /// Add a retry-delay ladder for transient failures.
    pub fn with_retry_delays(mut self, delays: impl Into<Vec<Duration>>) -> Self {
        self.retry_delays = delays.into();
        self
    }

    /// Transport configured for device commands.
    pub fn for_commands(timeout: Duration) -> Self {
        Self::new(timeout).with_retry_delays(COMMAND_RETRY_DELAYS)
    }

    /// GET a JSON document from a device path.
    pub async fn get_json(&self, device: &Device, path: &str) -> Result<Value, AdapterError> {
        self.request(device, Method::Get, path, None).await
    }

    /// POST an optional JSON body to a device path.
    pub async fn post_json(
        &self,
        device: &Device,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, AdapterError> {
        self.request(device, Method::Post, path, body).await
    }

    async fn request(
        &self,
        device: &Device,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, AdapterError> {
        let base = address::base_url(&device.address)
            .ok_or_else(|| AdapterError::MissingAddress(device.id.clone()))?;
        let url = address::join_device_url(base, path);
        let token = address::resolve_bearer_token(&device.address);

        let mut attempt = 0;
        loop {
            match self.send_once(&url, method, token.as_deref(), body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.retry_delays.len() => {
                    debug!(
                        device_id = %device.id,
                        url = %url,
                        attempt,
                        error = %err,
                        "retrying device request"
                    );
                    tokio::time::sleep(self.retry_delays[attempt]).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        method: Method,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value, AdapterError> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        }
        .timeout(self.timeout);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Http {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

#[derive(Clone, Copy)]
enum Method {
    Get,
    Post,
}
