//! Health poller.
//!
//! Probes every managed device's liveness and status endpoints once per
//! cycle, derives online/offline state with a short failure-reason label,
//! writes one merged state snapshot per device, and publishes a `state`
//! event whether or not anything changed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use fleet_core::{FleetEvent, SharedEventBus, SharedMetrics, StateUpdate};
use fleet_storage::{Device, DeviceDirectory, DeviceStateStore, StateMeta};

use crate::adapter::AdapterError;
use crate::address;
use crate::http::DeviceHttp;

/// Transport used for liveness/status probes.
///
/// Split from the adapters so the poller can be exercised against stub
/// devices in tests; production wiring hands it a [`DeviceHttp`].
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// GET a JSON document from a device path.
    async fn get_json(&self, device: &Device, path: &str) -> Result<Value, AdapterError>;
}

#[async_trait]
impl ProbeTransport for DeviceHttp {
    async fn get_json(&self, device: &Device, path: &str) -> Result<Value, AdapterError> {
        DeviceHttp::get_json(self, device, path).await
    }
}

struct LivenessOutcome {
    ok: bool,
    attempted: Vec<String>,
    succeeded: Option<String>,
    last_error: Option<String>,
    reason: Option<&'static str>,
}

/// Periodic liveness/status poller for all managed devices.
pub struct HealthPoller<T: ProbeTransport> {
    directory: Arc<dyn DeviceDirectory>,
    states: Arc<dyn DeviceStateStore>,
    bus: SharedEventBus,
    metrics: SharedMetrics,
    transport: T,
}

impl HealthPoller<DeviceHttp> {
    /// Poller over plain HTTP probes with the given per-request timeout.
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        states: Arc<dyn DeviceStateStore>,
        bus: SharedEventBus,
        metrics: SharedMetrics,
        probe_timeout: Duration,
    ) -> Self {
        Self::with_transport(directory, states, bus, metrics, DeviceHttp::new(probe_timeout))
    }
}

impl<T: ProbeTransport> HealthPoller<T> {
    /// Poller over an arbitrary probe transport.
    pub fn with_transport(
        directory: Arc<dyn DeviceDirectory>,
        states: Arc<dyn DeviceStateStore>,
        bus: SharedEventBus,
        metrics: SharedMetrics,
        transport: T,
    ) -> Self {
        Self {
            directory,
            states,
            bus,
            metrics,
            transport,
        }
    }

    /// Probe every managed device once, concurrently across devices.
    ///
    /// Individual device failures are folded into that device's state
    /// snapshot; only a directory read failure aborts the cycle.
    pub async fn poll_once(&self) -> fleet_core::Result<()> {
        let devices = self.directory.managed_devices().await?;
        let cycles = devices.iter().map(|device| self.poll_device(device));
        futures::future::join_all(cycles).await;
        Ok(())
    }

    async fn poll_device(&self, device: &Device) {
        // No resolvable address: no probe, no state write, no failure.
        if address::base_url(&device.address).is_none() {
            debug!(device_id = %device.id, "skipping device without base url");
            return;
        }

        let liveness = self.probe_liveness(device).await;
        let status = self.probe_status(device).await;

        let mut probe_meta = json!({
            "attempted_paths": liveness.attempted,
            "succeeded_path": liveness.succeeded,
            "last_error": liveness.last_error,
        });
        let mut patch = json!({
            "last_health": if liveness.ok { "ok" } else { "fail" },
        });
        match status {
            Ok(snapshot) => {
                patch["snapshot"] = snapshot;
            }
            Err(err) => {
                probe_meta["status_error"] = Value::String(err.to_string());
            }
        }
        patch["probe"] = probe_meta;

        let meta = if liveness.ok {
            self.metrics.set_device_online(&device.id, true);
            StateMeta::online(Utc::now())
        } else {
            let reason = liveness.reason.unwrap_or("error");
            self.metrics.set_device_online(&device.id, false);
            self.metrics.record_device_failure(&device.id, reason);
            StateMeta::offline(reason)
        };

        match self.states.upsert(&device.id, patch, meta).await {
            Ok(snapshot) => {
                self.bus.publish(FleetEvent::state(StateUpdate {
                    device_id: device.id.clone(),
                    status: snapshot.status.clone(),
                    last_seen: snapshot.last_seen,
                    state: snapshot.state.clone(),
                }));
            }
            Err(err) => {
                warn!(device_id = %device.id, error = %err, "failed to write device state");
            }
        }
    }

    /// Walk the ordered health-path candidates; first success wins.
    async fn probe_liveness(&self, device: &Device) -> LivenessOutcome {
        let mut outcome = LivenessOutcome {
            ok: false,
            attempted: Vec::new(),
            succeeded: None,
            last_error: None,
            reason: None,
        };

        for path in address::health_paths(&device.address) {
            outcome.attempted.push(path.clone());
            match self.transport.get_json(device, &path).await {
                Ok(body) => {
                    // A reachable endpoint that reports ok=false is down.
                    if body.get("ok").and_then(Value::as_bool) == Some(false) {
                        outcome.last_error =
                            Some(format!("{path} reported ok=false"));
                        outcome.reason = Some("unhealthy");
                        continue;
                    }
                    outcome.ok = true;
                    outcome.succeeded = Some(path);
                    break;
                }
                Err(err) => {
                    outcome.reason = Some(err.reason());
                    outcome.last_error = Some(err.to_string());
                }
            }
        }
        outcome
    }

    /// Fetch the status endpoint independently of the liveness outcome. A
    /// device can fail every health path and still return stale status
    /// data worth recording.
    async fn probe_status(&self, device: &Device) -> Result<Value, AdapterError> {
        self.transport
            .get_json(device, &address::status_path(&device.address))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{EventBus, Metrics, Topic};
    use fleet_storage::{DeviceKind, MemoryStore};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted probe transport: maps request paths to canned responses
    /// and records every call.
    struct StubTransport {
        responses: HashMap<String, std::result::Result<Value, &'static str>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, path: &str, value: Value) -> Self {
            self.responses.insert(path.to_string(), Ok(value));
            self
        }

        fn fail(mut self, path: &str, kind: &'static str) -> Self {
            self.responses.insert(path.to_string(), Err(kind));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ProbeTransport for StubTransport {
        async fn get_json(&self, device: &Device, path: &str) -> Result<Value, AdapterError> {
            self.calls.lock().push(format!("{}{}", device.id, path));
            match self.responses.get(path) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err("timeout")) => Err(AdapterError::Timeout),
                Some(Err("http_404")) => Err(AdapterError::Http { status: 404 }),
                Some(Err(other)) => Err(AdapterError::Connect((*other).to_string())),
                None => Err(AdapterError::Http { status: 404 }),
            }
        }
    }

    fn fixture(
        transport: StubTransport,
    ) -> (
        Arc<MemoryStore>,
        Arc<EventBus>,
        HealthPoller<StubTransport>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let poller = HealthPoller::with_transport(
            store.clone(),
            store.clone(),
            bus.clone(),
            metrics,
            transport,
        );
        (store, bus, poller)
    }

    #[tokio::test]
    async fn test_device_without_base_url_is_skipped() {
        let (store, _bus, poller) = fixture(StubTransport::new());
        let mut device = Device::new("dev-1", DeviceKind::Audio, "");
        device.address.base_url = None;
        store.put_device(device);

        poller.poll_once().await.unwrap();

        assert!(poller.transport.calls().is_empty());
        assert!(store.snapshot("dev-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_healthy_device_goes_online() {
        let transport = StubTransport::new()
            .respond("/healthz", json!({"ok": true}))
            .respond("/status", json!({"volume": 30}));
        let (store, bus, poller) = fixture(transport);
        store.put_device(Device::new("dev-1", DeviceKind::Audio, "http://d1"));
        let mut rx = bus.subscribe_topic(Topic::State);

        poller.poll_once().await.unwrap();

        let snapshot = store.snapshot("dev-1").await.unwrap().unwrap();
        assert_eq!(snapshot.status, "online");
        assert!(snapshot.last_seen.is_some());
        assert_eq!(snapshot.state["snapshot"]["volume"], 30);
        assert_eq!(snapshot.state["probe"]["succeeded_path"], "/healthz");

        let event = rx.try_recv().unwrap();
        match event {
            FleetEvent::State(update) => assert_eq!(update.status, "online"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_path_wins_after_primary_404() {
        let transport = StubTransport::new()
            .fail("/healthz", "http_404")
            .respond("/health", json!({"ok": true}))
            .respond("/status", json!({}));
        let (store, _bus, poller) = fixture(transport);
        store.put_device(Device::new("dev-1", DeviceKind::Video, "http://d1"));

        poller.poll_once().await.unwrap();

        let snapshot = store.snapshot("dev-1").await.unwrap().unwrap();
        assert_eq!(snapshot.status, "online");
        assert_eq!(
            snapshot.state["probe"]["attempted_paths"],
            json!(["/healthz", "/health"])
        );
        assert_eq!(snapshot.state["probe"]["succeeded_path"], "/health");
    }

    #[tokio::test]
    async fn test_unreachable_device_goes_offline_with_reason() {
        let transport = StubTransport::new()
            .fail("/healthz", "timeout")
            .fail("/health", "timeout")
            .respond("/status", json!({"stale": true}));
        let (store, _bus, poller) = fixture(transport);
        store.put_device(Device::new("dev-1", DeviceKind::Camera, "http://d1"));

        poller.poll_once().await.unwrap();

        let snapshot = store.snapshot("dev-1").await.unwrap().unwrap();
        assert_eq!(snapshot.status, "offline");
        assert_eq!(snapshot.offline_reason.as_deref(), Some("timeout"));
        assert_eq!(snapshot.state["last_health"], "fail");
        // Stale status data is still recorded.
        assert_eq!(snapshot.state["snapshot"]["stale"], true);
    }

    #[tokio::test]
    async fn test_ok_false_counts_as_down() {
        let transport = StubTransport::new()
            .respond("/healthz", json!({"ok": false}))
            .fail("/health", "http_404")
            .fail("/status", "http_404");
        let (store, _bus, poller) = fixture(transport);
        store.put_device(Device::new("dev-1", DeviceKind::Zigbee, "http://d1"));

        poller.poll_once().await.unwrap();

        let snapshot = store.snapshot("dev-1").await.unwrap().unwrap();
        assert_eq!(snapshot.status, "offline");
        assert!(snapshot.state["probe"]["status_error"].is_string());
    }

    #[tokio::test]
    async fn test_repeated_polls_are_idempotent() {
        let transport = StubTransport::new()
            .respond("/healthz", json!({"ok": true}))
            .respond("/status", json!({"volume": 10}));
        let (store, _bus, poller) = fixture(transport);
        store.put_device(Device::new("dev-1", DeviceKind::Audio, "http://d1"));

        poller.poll_once().await.unwrap();
        let first = store.snapshot("dev-1").await.unwrap().unwrap();
        poller.poll_once().await.unwrap();
        let second = store.snapshot("dev-1").await.unwrap().unwrap();

        assert_eq!(first.status, second.status);
        assert!(second.last_seen.unwrap() >= first.last_seen.unwrap());
    }
}
