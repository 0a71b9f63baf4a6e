//! Group command model.
//!
//! A group command fans out to every member device; its terminal status is
//! a pure function of the per-device outcome multiset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of a group command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupCommandStatus {
    /// Created, dispatch not started yet.
    Pending,
    /// Fan-out in flight; runs to completion, there is no abort path.
    InProgress,
    /// Every device attempt succeeded.
    Completed,
    /// At least one success and at least one failure.
    PartialSuccess,
    /// No device attempt succeeded.
    Failed,
}

impl GroupCommandStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupCommandStatus::Pending => "pending",
            GroupCommandStatus::InProgress => "in_progress",
            GroupCommandStatus::Completed => "completed",
            GroupCommandStatus::PartialSuccess => "partial_success",
            GroupCommandStatus::Failed => "failed",
        }
    }

    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GroupCommandStatus::Completed
                | GroupCommandStatus::PartialSuccess
                | GroupCommandStatus::Failed
        )
    }
}

impl std::fmt::Display for GroupCommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one device attempt within a group command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// The adapter call succeeded.
    Success,
    /// The adapter call failed; the error is recorded on the result.
    Error,
}

/// Per-device result entry in the group command ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResult {
    /// Device the attempt targeted.
    pub device_id: String,
    /// Attempt outcome.
    pub status: DeviceOutcome,
    /// Error message for failed attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceResult {
    /// Successful attempt.
    pub fn success(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            status: DeviceOutcome::Success,
            error: None,
        }
    }

    /// Failed attempt with an error message.
    pub fn error(device_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            status: DeviceOutcome::Error,
            error: Some(error.into()),
        }
    }
}

/// One group command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLog {
    /// Unique identifier (also the job id surfaced to callers).
    pub id: String,
    /// Target group.
    pub group_id: String,
    /// Logical command name.
    pub command: String,
    /// Command payload.
    pub payload: Value,
    /// Requesting user, when known.
    pub user_id: Option<String>,
    /// Current status.
    pub status: GroupCommandStatus,
    /// Per-device results, filled when the command resolves.
    pub results: Vec<DeviceResult>,
    /// Error message for commands failed before or during dispatch.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl CommandLog {
    /// Create a pending command log row.
    pub fn new(
        group_id: impl Into<String>,
        command: impl Into<String>,
        payload: Value,
        user_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            command: command.into(),
            payload,
            user_id,
            status: GroupCommandStatus::Pending,
            results: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
