//! Store trait seams consumed by the orchestration core.
//!
//! These are the only interfaces through which the core reads devices and
//! mutates jobs, command logs, and state snapshots. All job mutation goes
//! through `JobStore::transition`, a conditional update keyed on the
//! expected prior status; there is no other concurrency-control primitive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use fleet_core::Result;

use crate::command_log::{CommandLog, DeviceResult, GroupCommandStatus};
use crate::device::Device;
use crate::job::{Job, JobStatus, NewJob};
use crate::state::{DeviceStateSnapshot, StateMeta};

/// Read-only device and group lookups.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Look up a device by id.
    async fn device(&self, id: &str) -> Result<Option<Device>>;

    /// All devices with the `managed` flag set.
    async fn managed_devices(&self) -> Result<Vec<Device>>;

    /// Member devices of a group.
    async fn group_members(&self, group_id: &str) -> Result<Vec<Device>>;
}

/// Durable record of single-device jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending`.
    async fn create(&self, new: NewJob) -> Result<Job>;

    /// Look up a job by id.
    async fn job(&self, id: &str) -> Result<Option<Job>>;

    /// Up to `limit` oldest pending jobs.
    async fn pending(&self, limit: usize) -> Result<Vec<Job>>;

    /// Conditionally transition a job.
    ///
    /// Applies `next` (and the optional error message) only if the job's
    /// current status equals `expected`. Returns `Ok(None)` when the guard
    /// does not hold, which callers treat as a lost claim rather than an
    /// error.
    async fn transition(
        &self,
        id: &str,
        expected: JobStatus,
        next: JobStatus,
        error: Option<String>,
    ) -> Result<Option<Job>>;
}

/// Durable record of group commands.
#[async_trait]
pub trait CommandLogStore: Send + Sync {
    /// Insert a command log row.
    async fn create(&self, log: CommandLog) -> Result<CommandLog>;

    /// Look up a command log by id.
    async fn command_log(&self, id: &str) -> Result<Option<CommandLog>>;

    /// Update status and, for terminal states, the per-device results.
    async fn set_status(
        &self,
        id: &str,
        status: GroupCommandStatus,
        results: Option<Vec<DeviceResult>>,
        error: Option<String>,
    ) -> Result<CommandLog>;
}

/// Device state snapshot store with merge-upsert semantics.
#[async_trait]
pub trait DeviceStateStore: Send + Sync {
    /// Most recent snapshot for a device.
    async fn snapshot(&self, device_id: &str) -> Result<Option<DeviceStateSnapshot>>;

    /// Merge `patch` into the existing snapshot and apply `meta`.
    ///
    /// Existing snapshot fields are preserved, new fields overlaid.
    async fn upsert(
        &self,
        device_id: &str,
        patch: Value,
        meta: StateMeta,
    ) -> Result<DeviceStateSnapshot>;
}

/// Audit trail entry for the device event log.
#[derive(Debug, Clone)]
pub struct DeviceEventRecord {
    /// Device the entry concerns.
    pub device_id: String,
    /// Entry type, e.g. `command.accepted`.
    pub event_type: String,
    /// Entry payload.
    pub payload: Value,
    /// Originating component (`api`, `worker`, `orchestrator`).
    pub origin: String,
    /// Correlated job or command-log id.
    pub correlation_id: Option<String>,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

impl DeviceEventRecord {
    /// Build an audit entry stamped now.
    pub fn new(
        device_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: Value,
        origin: impl Into<String>,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            event_type: event_type.into(),
            payload,
            origin: origin.into(),
            correlation_id,
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget audit/event-log sink.
#[async_trait]
pub trait DeviceEventSink: Send + Sync {
    /// Record an audit entry. Failures are logged by callers, never fatal.
    async fn record(&self, event: DeviceEventRecord) -> Result<()>;
}
