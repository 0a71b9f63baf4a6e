//! Runtime configuration.
//!
//! Every knob has a sensible default and can be overridden through the
//! environment, matching the deployment convention of the surrounding
//! dashboard (`POLL_INTERVAL_MS`, `SSE_HEARTBEAT_MS`, ...).

use std::time::Duration;

/// Configuration for the orchestration core.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Interval between worker ticks (batch execution + health poll).
    pub poll_interval_ms: u64,
    /// Idle heartbeat interval for push streams.
    pub heartbeat_ms: u64,
    /// Timeout for a single health/status probe request.
    pub probe_timeout_ms: u64,
    /// Timeout for a device command request.
    pub command_timeout_ms: u64,
    /// Maximum number of pending jobs claimed per batch.
    pub job_batch_size: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            heartbeat_ms: 15_000,
            probe_timeout_ms: 3_000,
            command_timeout_ms: 5_000,
            job_batch_size: 20,
        }
    }
}

impl FleetConfig {
    /// Build a configuration from the environment, falling back to
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_ms: env_u64("POLL_INTERVAL_MS", defaults.poll_interval_ms),
            heartbeat_ms: env_u64("SSE_HEARTBEAT_MS", defaults.heartbeat_ms),
            probe_timeout_ms: env_u64("PROBE_TIMEOUT_MS", defaults.probe_timeout_ms),
            command_timeout_ms: env_u64("OPERATION_TIMEOUT_MS", defaults.command_timeout_ms),
            job_batch_size: env_u64("JOB_BATCH_SIZE", defaults.job_batch_size as u64) as usize,
        }
    }

    /// Worker tick interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Push-stream heartbeat interval.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    /// Probe request timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Command request timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
