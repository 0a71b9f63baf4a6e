//! SSE event fanout.
//!
//! Each connection holds its own bus receiver; dropping the connection
//! drops the receiver, which is the unsubscribe operation. Events are
//! framed with the topic name so browser clients can use named
//! `EventSource` listeners. Idle connections get a heartbeat comment so
//! proxies do not reap them.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;

use fleet_core::{SharedEventBus, SharedMetrics, Topic};

use crate::StreamState;

/// Event stream query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Restrict the stream to one topic (`state` or `job`). Omitted or
    /// `all` means both topics.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Decrements the open-connection gauge when the stream is dropped.
struct ConnectionGuard {
    metrics: SharedMetrics,
}

impl ConnectionGuard {
    fn open(metrics: SharedMetrics) -> Self {
        metrics.stream_connections.inc();
        Self { metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.metrics.stream_connections.dec();
    }
}

fn parse_topic(raw: Option<&str>) -> Result<Option<Topic>, StatusCode> {
    match raw {
        None | Some("all") => Ok(None),
        Some("state") => Ok(Some(Topic::State)),
        Some("job") => Ok(Some(Topic::Job)),
        Some(_) => Err(StatusCode::BAD_REQUEST),
    }
}

/// One subscription covering both topics; the optional filter is applied
/// per event rather than at subscription time.
fn event_stream(
    bus: SharedEventBus,
    metrics: SharedMetrics,
    topic: Option<Topic>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let mut rx = bus.subscribe();
    let guard = ConnectionGuard::open(metrics);

    async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            if let Some(topic) = topic {
                if event.topic() != topic {
                    continue;
                }
            }
            let sse_event = Event::default()
                .event(event.topic().as_str())
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data(""));
            yield Ok(sse_event);
        }
    }
}

/// SSE endpoint streaming live state and job updates.
pub async fn event_stream_handler(
    State(state): State<StreamState>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, StatusCode> {
    let topic = parse_topic(params.topic.as_deref())?;
    let stream = event_stream(state.bus.clone(), state.metrics.clone(), topic);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.config.heartbeat())
            .text("keepalive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{EventBus, FleetEvent, JobUpdate, Metrics, StateUpdate};
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn job_event(job_id: &str) -> FleetEvent {
        FleetEvent::job(JobUpdate::for_device(job_id, "dev-1", "play", "pending"))
    }

    fn state_event(device_id: &str) -> FleetEvent {
        FleetEvent::state(StateUpdate {
            device_id: device_id.to_string(),
            status: "online".to_string(),
            last_seen: None,
            state: serde_json::json!({}),
        })
    }

    #[test]
    fn test_parse_topic() {
        assert_eq!(parse_topic(None).unwrap(), None);
        assert_eq!(parse_topic(Some("all")).unwrap(), None);
        assert_eq!(parse_topic(Some("state")).unwrap(), Some(Topic::State));
        assert_eq!(parse_topic(Some("job")).unwrap(), Some(Topic::Job));
        assert_eq!(
            parse_topic(Some("bogus")).unwrap_err(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_stream_yields_published_events() {
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let stream = event_stream(bus.clone(), metrics, None);
        tokio::pin!(stream);

        bus.publish(job_event("j1"));

        let item = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert!(item.is_ok());
    }

    #[tokio::test]
    async fn test_topic_filter_skips_other_topic() {
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let stream = event_stream(bus.clone(), metrics, Some(Topic::Job));
        tokio::pin!(stream);

        bus.publish(state_event("dev-1"));
        bus.publish(job_event("j1"));

        // The state event is filtered; the first item is the job event.
        let item = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert!(item.is_ok());
        assert!(futures::poll!(stream.next()).is_pending());
    }

    #[tokio::test]
    async fn test_connection_gauge_tracks_stream_lifetime() {
        let bus = Arc::new(EventBus::new());
        let metrics = Arc::new(Metrics::new().unwrap());

        {
            let _stream = event_stream(bus.clone(), metrics.clone(), None);
            assert_eq!(metrics.stream_connections.get(), 1);
        }
        assert_eq!(metrics.stream_connections.get(), 0);
    }
}
