//! Group command orchestration.
//!
//! A group command fans out to the group's member devices one at a time.
//! Each device attempt is isolated: a failure is recorded as that
//! device's result and the fan-out moves on. The command's terminal
//! status is derived purely from the multiset of per-device outcomes.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, warn};

use fleet_core::{Error, FleetEvent, JobUpdate, Result, SharedEventBus, StateUpdate};
use fleet_devices::{AdapterRegistry, DeviceAdapter};
use fleet_storage::{
    CommandLog, CommandLogStore, Device, DeviceDirectory, DeviceEventRecord, DeviceEventSink,
    DeviceKind, DeviceOutcome, DeviceResult, DeviceStateStore, GroupCommandStatus, StateMeta,
};

/// Command-name prefixes handled by the group's zigbee coordinator rather
/// than by each member device individually.
const COORDINATOR_COMMAND_PREFIXES: &[&str] = &["permit_join", "reset", "publish"];

fn is_coordinator_command(command: &str) -> bool {
    COORDINATOR_COMMAND_PREFIXES
        .iter()
        .any(|prefix| command.starts_with(prefix))
}

/// Terminal status of a group command as a pure function of its
/// per-device results.
///
/// All successes resolve to `completed`, a mix to `partial_success`, and
/// zero successes (including an empty result set) to `failed`.
pub fn aggregate_outcome(results: &[DeviceResult]) -> GroupCommandStatus {
    let successes = results
        .iter()
        .filter(|r| r.status == DeviceOutcome::Success)
        .count();
    if successes == 0 {
        GroupCommandStatus::Failed
    } else if successes == results.len() {
        GroupCommandStatus::Completed
    } else {
        GroupCommandStatus::PartialSuccess
    }
}

/// Orchestrates group commands across member devices.
pub struct GroupOrchestrator {
    directory: Arc<dyn DeviceDirectory>,
    command_logs: Arc<dyn CommandLogStore>,
    states: Arc<dyn DeviceStateStore>,
    audit: Arc<dyn DeviceEventSink>,
    registry: Arc<AdapterRegistry>,
    bus: SharedEventBus,
}

impl GroupOrchestrator {
    /// Create an orchestrator over the given stores and adapters.
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        command_logs: Arc<dyn CommandLogStore>,
        states: Arc<dyn DeviceStateStore>,
        audit: Arc<dyn DeviceEventSink>,
        registry: Arc<AdapterRegistry>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            directory,
            command_logs,
            states,
            audit,
            registry,
            bus,
        }
    }

    /// Accept a group command and dispatch it in the background.
    ///
    /// Returns the pending command log immediately; the fan-out runs on a
    /// detached task. A dispatch failure is caught there and forces the
    /// log to `failed` so no command is left dangling in `in_progress`.
    pub async fn enqueue_group(
        self: &Arc<Self>,
        group_id: impl Into<String>,
        command: impl Into<String>,
        payload: serde_json::Value,
        user_id: Option<String>,
    ) -> Result<CommandLog> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
        if !(payload.is_object() || payload.is_null()) {
            return Err(Error::Validation(
                "payload must be a JSON object".to_string(),
            ));
        }

        let log = self
            .command_logs
            .create(CommandLog::new(group_id, command, payload, user_id))
            .await?;

        self.bus.publish(FleetEvent::job(JobUpdate::for_group(
            &log.id,
            &log.group_id,
            &log.command,
            log.status.as_str(),
        )));

        let orchestrator = Arc::clone(self);
        let dispatched = log.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.process_group(&dispatched).await {
                error!(
                    command_log_id = %dispatched.id,
                    error = %err,
                    "group dispatch failed"
                );
                orchestrator
                    .resolve(&dispatched, GroupCommandStatus::Failed, Vec::new(), Some(err.to_string()))
                    .await;
            }
        });

        Ok(log)
    }

    /// Fan a command out to the group's member devices.
    async fn process_group(&self, log: &CommandLog) -> Result<()> {
        self.command_logs
            .set_status(&log.id, GroupCommandStatus::InProgress, None, None)
            .await?;
        self.bus.publish(FleetEvent::job(JobUpdate::for_group(
            &log.id,
            &log.group_id,
            &log.command,
            GroupCommandStatus::InProgress.as_str(),
        )));

        let members = self.directory.group_members(&log.group_id).await?;
        if members.is_empty() {
            let message = format!("group {} has no member devices", log.group_id);
            self.resolve(log, GroupCommandStatus::Failed, Vec::new(), Some(message))
                .await;
            return Ok(());
        }

        let (targets, forced) = self.route(&log.command, members);
        if targets.is_empty() {
            let message = format!(
                "group {} has no zigbee or video members to run {}",
                log.group_id, log.command
            );
            self.resolve(log, GroupCommandStatus::Failed, Vec::new(), Some(message))
                .await;
            return Ok(());
        }
        let mut results = Vec::with_capacity(targets.len());

        for device in &targets {
            let adapter = forced.unwrap_or_else(|| self.registry.for_kind(device.kind));
            match adapter.execute(device, &log.command, &log.payload).await {
                Ok(result) => {
                    results.push(DeviceResult::success(&device.id));
                    self.record_audit(DeviceEventRecord::new(
                        &device.id,
                        "command.succeeded",
                        json!({ "command": log.command, "result": result }),
                        "orchestrator",
                        Some(log.id.clone()),
                    ))
                    .await;
                    self.refresh_state(device, adapter).await;
                }
                Err(err) => {
                    results.push(DeviceResult::error(&device.id, err.to_string()));
                    self.record_audit(DeviceEventRecord::new(
                        &device.id,
                        "command.failed",
                        json!({ "command": log.command, "error": err.to_string() }),
                        "orchestrator",
                        Some(log.id.clone()),
                    ))
                    .await;
                }
            }
        }

        let terminal = aggregate_outcome(&results);
        self.resolve(log, terminal, results, None).await;
        Ok(())
    }

    /// Pick the devices a command targets, and the adapter override when
    /// the command belongs to the coordinator.
    ///
    /// Commands whose name starts with a coordinator prefix go to the
    /// group's zigbee devices through the zigbee adapter. A group with no zigbee member falls back to its
    /// video devices, still through the zigbee adapter; this mirrors
    /// installations that hang the coordinator off the video controller.
    fn route<'a>(
        &'a self,
        command: &str,
        members: Vec<Device>,
    ) -> (Vec<Device>, Option<&'a Arc<dyn DeviceAdapter>>) {
        if !is_coordinator_command(command) {
            return (members, None);
        }

        let mut zigbee = Vec::new();
        let mut video = Vec::new();
        for device in members {
            match device.kind {
                DeviceKind::Zigbee => zigbee.push(device),
                DeviceKind::Video => video.push(device),
                _ => {}
            }
        }
        let targets = if zigbee.is_empty() { video } else { zigbee };
        (targets, Some(self.registry.zigbee()))
    }

    /// Persist the terminal status and publish the final lifecycle event.
    /// Persistence failures here are logged, not propagated; there is no
    /// caller left to observe them.
    async fn resolve(
        &self,
        log: &CommandLog,
        status: GroupCommandStatus,
        results: Vec<DeviceResult>,
        error_message: Option<String>,
    ) {
        let stored = self
            .command_logs
            .set_status(&log.id, status, Some(results.clone()), error_message.clone())
            .await;
        if let Err(err) = stored {
            warn!(command_log_id = %log.id, error = %err, "failed to persist terminal status");
        }

        let mut update =
            JobUpdate::for_group(&log.id, &log.group_id, &log.command, status.as_str());
        if let Some(message) = error_message {
            update = update.with_error(message);
        }
        if !results.is_empty() {
            match serde_json::to_value(&results) {
                Ok(value) => update = update.with_results(value),
                Err(err) => warn!(error = %err, "failed to serialize device results"),
            }
        }
        self.bus.publish(FleetEvent::job(update));
    }

    /// Re-read a device's status after a successful command so observers
    /// see the new state without waiting for the next poll cycle.
    async fn refresh_state(&self, device: &Device, adapter: &Arc<dyn DeviceAdapter>) {
        let snapshot = match adapter.status(device).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!(device_id = %device.id, error = %err, "status refresh failed");
                return;
            }
        };

        let patch = json!({ "snapshot": snapshot });
        match self
            .states
            .upsert(&device.id, patch, StateMeta::online(chrono::Utc::now()))
            .await
        {
            Ok(state) => {
                self.bus.publish(FleetEvent::state(StateUpdate {
                    device_id: device.id.clone(),
                    status: state.status.clone(),
                    last_seen: state.last_seen,
                    state: state.state.clone(),
                }));
            }
            Err(err) => {
                warn!(device_id = %device.id, error = %err, "failed to write refreshed state");
            }
        }
    }

    async fn record_audit(&self, record: DeviceEventRecord) {
        if let Err(err) = self.audit.record(record).await {
            warn!(error = %err, "failed to record audit entry");
        }
    }
}
