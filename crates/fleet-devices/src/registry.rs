//! Static adapter registry.
//!
//! One adapter per device kind, resolved once at startup. Lookup is a
//! tagged-variant match on `DeviceKind`, not string dispatch per call.

use std::sync::Arc;
use std::time::Duration;

use fleet_storage::DeviceKind;

use crate::adapter::DeviceAdapter;
use crate::adapters::{AudioAdapter, CameraAdapter, VideoAdapter, ZigbeeAdapter};
use crate::http::DeviceHttp;

/// Registry mapping each device kind to its adapter.
pub struct AdapterRegistry {
    audio: Arc<dyn DeviceAdapter>,
    video: Arc<dyn DeviceAdapter>,
    camera: Arc<dyn DeviceAdapter>,
    zigbee: Arc<dyn DeviceAdapter>,
}

impl AdapterRegistry {
    /// Build a registry from explicit adapters (test doubles included).
    pub fn new(
        audio: Arc<dyn DeviceAdapter>,
        video: Arc<dyn DeviceAdapter>,
        camera: Arc<dyn DeviceAdapter>,
        zigbee: Arc<dyn DeviceAdapter>,
    ) -> Self {
        Self {
            audio,
            video,
            camera,
            zigbee,
        }
    }

    /// Build the production registry of HTTP adapters, all sharing one
    /// command transport configuration.
    pub fn http(command_timeout: Duration) -> Self {
        let http = DeviceHttp::for_commands(command_timeout);
        Self::new(
            Arc::new(AudioAdapter::new(http.clone())),
            Arc::new(VideoAdapter::new(http.clone())),
            Arc::new(CameraAdapter::new(http.clone())),
            Arc::new(ZigbeeAdapter::new(http)),
        )
    }

    /// Adapter for a device kind.
    pub fn for_kind(&self, kind: DeviceKind) -> &Arc<dyn DeviceAdapter> {
        match kind {
            DeviceKind::Audio => &self.audio,
            DeviceKind::Video => &self.video,
            DeviceKind::Camera => &self.camera,
            DeviceKind::Zigbee => &self.zigbee,
        }
    }

    /// The zigbee adapter, used by the group orchestrator's
    /// coordinator-command routing rule.
    pub fn zigbee(&self) -> &Arc<dyn DeviceAdapter> {
        &self.zigbee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_registry_covers_every_kind() {
        let registry = AdapterRegistry::http(Duration::from_secs(5));
        for kind in DeviceKind::ALL {
            assert_eq!(registry.for_kind(*kind).kind(), *kind);
        }
        assert_eq!(registry.zigbee().kind(), DeviceKind::Zigbee);
    }
}
