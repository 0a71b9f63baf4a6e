//! Push-stream surface: SSE event fanout and the metrics exposition
//! endpoint.

pub mod metrics;
pub mod sse;

use axum::routing::get;
use axum::Router;

use fleet_core::{FleetConfig, SharedEventBus, SharedMetrics};

/// Shared state for the stream handlers.
#[derive(Clone)]
pub struct StreamState {
    /// Event bus the SSE fanout subscribes to.
    pub bus: SharedEventBus,
    /// Metrics registry, updated by the fanout and rendered on demand.
    pub metrics: SharedMetrics,
    /// Runtime configuration (heartbeat interval).
    pub config: FleetConfig,
}

/// Router exposing the event stream and the metrics endpoint.
pub fn router(state: StreamState) -> Router {
    Router::new()
        .route("/api/events", get(sse::event_stream_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(state)
}
