//! Device adapters and health polling.
//!
//! Turns logical commands into network calls against per-kind device HTTP
//! endpoints, and continuously probes managed devices for liveness and
//! status. Adapters are resolved through a static registry built once at
//! startup; each adapter owns its own timeout and retry policy.

pub mod adapter;
pub mod adapters;
pub mod address;
pub mod http;
pub mod poller;
pub mod registry;

pub use adapter::{AdapterError, DeviceAdapter};
pub use adapters::{AudioAdapter, CameraAdapter, VideoAdapter, ZigbeeAdapter};
pub use http::DeviceHttp;
pub use poller::{HealthPoller, ProbeTransport};
pub use registry::AdapterRegistry;
