//! Core traits and types for the fleet orchestration core.
//!
//! This crate defines the foundational abstractions shared across the
//! workspace: the error taxonomy, the event model and event bus, runtime
//! configuration, and the Prometheus metrics registry.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;

pub use bus::{EventBus, EventBusReceiver, SharedEventBus, TopicReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use config::FleetConfig;
pub use error::{Error, Result};
pub use event::{FleetEvent, JobUpdate, StateUpdate, Topic};
pub use metrics::{Metrics, SharedMetrics};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::bus::{EventBus, SharedEventBus};
    pub use crate::config::FleetConfig;
    pub use crate::error::{Error, Result};
    pub use crate::event::{FleetEvent, JobUpdate, StateUpdate, Topic};
    pub use crate::metrics::{Metrics, SharedMetrics};
}
