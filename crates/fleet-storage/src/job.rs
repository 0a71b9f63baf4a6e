//! Single-device job model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of a single-device job.
///
/// Terminal states are never re-entered; a failed job does not go back
/// into the queue automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting to be claimed by an executor.
    Pending,
    /// Claimed; at most one executor holds a job in this state.
    Running,
    /// Adapter call succeeded.
    Succeeded,
    /// Adapter call failed; the error message is attached to the job.
    Failed,
}

impl JobStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One single-device command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier.
    pub id: String,
    /// Target device.
    pub device_id: String,
    /// Logical command name.
    pub command: String,
    /// Command payload.
    pub payload: Value,
    /// Current status.
    pub status: JobStatus,
    /// Error message for failed jobs.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Target device.
    pub device_id: String,
    /// Logical command name.
    pub command: String,
    /// Command payload.
    pub payload: Value,
}

impl NewJob {
    /// Materialize a pending job row.
    pub fn into_job(self) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4().to_string(),
            device_id: self.device_id,
            command: self.command,
            payload: self.payload,
            status: JobStatus::Pending,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_terminal() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_new_job_starts_pending() {
        let job = NewJob {
            device_id: "dev-1".to_string(),
            command: "play".to_string(),
            payload: serde_json::json!({"fileId": "f1"}),
        }
        .into_job();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error.is_none());
        assert!(!job.id.is_empty());
    }
}
