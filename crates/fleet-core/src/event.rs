//! Event model for the fleet event bus.
//!
//! Events are ephemeral: they exist only for the duration of delivery to
//! currently-subscribed observers and are never persisted or replayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event bus topics.
///
/// The bus carries exactly two topics: device state changes and job
/// lifecycle updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Device state snapshots from the health poller and state refreshes.
    State,
    /// Single-device job and group command lifecycle updates.
    Job,
}

impl Topic {
    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::State => "state",
            Topic::Job => "job",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle update published on the `job` topic.
///
/// Covers both single-device jobs and group commands; exactly one of
/// `device_id` / `group_id` is set depending on the job flavor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdate {
    /// Job or command-log identifier.
    pub job_id: String,
    /// Target device for single-device jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Target group for group commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Logical command name.
    pub command: String,
    /// Current status as a wire string (`pending`, `running`, ...).
    pub status: String,
    /// Error message for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-device results for terminal group commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
}

/// Device state update published on the `state` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Device identifier.
    pub device_id: String,
    /// `online` / `offline` / `unknown`.
    pub status: String,
    /// Last time the device answered a liveness probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// Merged state snapshot payload.
    pub state: Value,
}

/// Event carried by the fleet event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data", rename_all = "snake_case")]
pub enum FleetEvent {
    /// Job lifecycle update.
    Job(JobUpdate),
    /// Device state update.
    State(StateUpdate),
}

impl FleetEvent {
    /// Topic this event belongs to.
    pub fn topic(&self) -> Topic {
        match self {
            FleetEvent::Job(_) => Topic::Job,
            FleetEvent::State(_) => Topic::State,
        }
    }

    /// Build a job update event.
    pub fn job(update: JobUpdate) -> Self {
        FleetEvent::Job(update)
    }

    /// Build a state update event.
    pub fn state(update: StateUpdate) -> Self {
        FleetEvent::State(update)
    }
}

impl JobUpdate {
    /// Update for a single-device job.
    pub fn for_device(
        job_id: impl Into<String>,
        device_id: impl Into<String>,
        command: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            device_id: Some(device_id.into()),
            group_id: None,
            command: command.into(),
            status: status.into(),
            error: None,
            results: None,
        }
    }

    /// Update for a group command.
    pub fn for_group(
        job_id: impl Into<String>,
        group_id: impl Into<String>,
        command: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            device_id: None,
            group_id: Some(group_id.into()),
            command: command.into(),
            status: status.into(),
            error: None,
            results: None,
        }
    }

    /// Attach an error message.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attach per-device results.
    pub fn with_results(mut self, results: Value) -> Self {
        self.results = Some(results);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::State.as_str(), "state");
        assert_eq!(Topic::Job.as_str(), "job");
    }

    #[test]
    fn test_event_topic() {
        let job = FleetEvent::job(JobUpdate::for_device("j1", "dev-1", "play", "pending"));
        assert_eq!(job.topic(), Topic::Job);

        let state = FleetEvent::state(StateUpdate {
            device_id: "dev-1".to_string(),
            status: "online".to_string(),
            last_seen: None,
            state: serde_json::json!({}),
        });
        assert_eq!(state.topic(), Topic::State);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = FleetEvent::job(
            JobUpdate::for_group("j1", "g1", "stop", "failed").with_error("no members"),
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["topic"], "job");
        assert_eq!(value["data"]["group_id"], "g1");
        assert_eq!(value["data"]["error"], "no members");
        assert!(value["data"].get("device_id").is_none());
    }
}
