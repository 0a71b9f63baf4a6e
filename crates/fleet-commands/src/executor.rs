//! Single-device job executor.
//!
//! Jobs enter through [`JobExecutor::enqueue`] and are drained in batches
//! by [`JobExecutor::run_pending_batch`]. A batch claims each job with a
//! conditional `pending -> running` transition; a claim miss means another
//! executor took the job and this one skips it without error.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use fleet_core::{Error, FleetEvent, JobUpdate, Result, SharedEventBus, SharedMetrics};
use fleet_devices::AdapterRegistry;
use fleet_storage::{
    Device, DeviceDirectory, DeviceEventRecord, DeviceEventSink, Job, JobStatus, JobStore, NewJob,
};

/// Executes single-device jobs against device adapters.
pub struct JobExecutor {
    directory: Arc<dyn DeviceDirectory>,
    jobs: Arc<dyn JobStore>,
    audit: Arc<dyn DeviceEventSink>,
    registry: Arc<AdapterRegistry>,
    bus: SharedEventBus,
    metrics: SharedMetrics,
    batch_size: usize,
}

impl JobExecutor {
    /// Create an executor draining up to `batch_size` jobs per run.
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        jobs: Arc<dyn JobStore>,
        audit: Arc<dyn DeviceEventSink>,
        registry: Arc<AdapterRegistry>,
        bus: SharedEventBus,
        metrics: SharedMetrics,
        batch_size: usize,
    ) -> Self {
        Self {
            directory,
            jobs,
            audit,
            registry,
            bus,
            metrics,
            batch_size,
        }
    }

    /// Accept a job for a known device.
    ///
    /// Validation here is structural only: the command must be non-empty
    /// and the device must exist. Whether the device's adapter understands
    /// the command is decided at execution time, so an unsupported command
    /// becomes a failed job rather than a rejected enqueue.
    pub async fn enqueue(&self, new: NewJob) -> Result<Job> {
        if new.command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
        if !(new.payload.is_object() || new.payload.is_null()) {
            return Err(Error::Validation(
                "payload must be a JSON object".to_string(),
            ));
        }
        let device = self
            .directory
            .device(&new.device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {}", new.device_id)))?;

        let job = self.jobs.create(new).await?;

        self.record_audit(DeviceEventRecord::new(
            &device.id,
            "command.accepted",
            json!({ "command": job.command, "payload": job.payload }),
            "api",
            Some(job.id.clone()),
        ))
        .await;

        self.publish_job(&job);
        Ok(job)
    }

    /// Claim and execute up to one batch of pending jobs, oldest first.
    ///
    /// Returns the number of jobs this executor actually ran. Jobs lost
    /// to a concurrent claimer are skipped and not counted.
    pub async fn run_pending_batch(&self) -> Result<usize> {
        let batch = self.jobs.pending(self.batch_size).await?;
        let mut executed = 0;

        for job in batch {
            let claimed = self
                .jobs
                .transition(&job.id, JobStatus::Pending, JobStatus::Running, None)
                .await?;
            let Some(job) = claimed else {
                debug!(job_id = %job.id, "job claimed elsewhere, skipping");
                continue;
            };

            self.publish_job(&job);
            self.execute_claimed(job).await?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Run one claimed job to its terminal status.
    async fn execute_claimed(&self, job: Job) -> Result<()> {
        let device = match self.directory.device(&job.device_id).await? {
            Some(device) => device,
            None => {
                let message = format!("device {} not found", job.device_id);
                self.finish(&job, None, Err((message, "not_found"))).await?;
                return Ok(());
            }
        };

        let adapter = self.registry.for_kind(device.kind);
        let timer = self.metrics.job_timer();
        let outcome = adapter.execute(&device, &job.command, &job.payload).await;
        timer.observe_duration();

        match outcome {
            Ok(result) => {
                self.finish(&job, Some(&device), Ok(result)).await?;
            }
            Err(err) => {
                let reason = err.reason();
                self.finish(&job, Some(&device), Err((err.to_string(), reason)))
                    .await?;
            }
        }
        Ok(())
    }

    /// Persist the terminal transition, audit it, and publish the final
    /// lifecycle event. Failures carry a short reason label for the
    /// per-device failure counter.
    async fn finish(
        &self,
        job: &Job,
        device: Option<&Device>,
        outcome: std::result::Result<serde_json::Value, (String, &'static str)>,
    ) -> Result<()> {
        let (next, error, success) = match &outcome {
            Ok(_) => (JobStatus::Succeeded, None, true),
            Err((message, _)) => (JobStatus::Failed, Some(message.clone()), false),
        };

        let finished = self
            .jobs
            .transition(&job.id, JobStatus::Running, next, error.clone())
            .await?;
        if finished.is_none() {
            warn!(job_id = %job.id, "job left running state underneath us");
            return Ok(());
        }

        self.metrics.record_job_outcome(&job.device_id, success);
        if let Err((_, reason)) = &outcome {
            self.metrics.record_device_failure(&job.device_id, reason);
        }

        if device.is_some() {
            let (event_type, payload) = match &outcome {
                Ok(result) => ("command.succeeded", json!({ "result": result })),
                Err((message, _)) => ("command.failed", json!({ "error": message })),
            };
            self.record_audit(DeviceEventRecord::new(
                &job.device_id,
                event_type,
                payload,
                "worker",
                Some(job.id.clone()),
            ))
            .await;
        }

        let mut update =
            JobUpdate::for_device(&job.id, &job.device_id, &job.command, next.as_str());
        if let Some(message) = error {
            update = update.with_error(message);
        }
        self.bus.publish(FleetEvent::job(update));
        Ok(())
    }

    fn publish_job(&self, job: &Job) {
        self.bus.publish(FleetEvent::job(JobUpdate::for_device(
            &job.id,
            &job.device_id,
            &job.command,
            job.status.as_str(),
        )));
    }

    /// Audit writes never fail the job.
    async fn record_audit(&self, record: DeviceEventRecord) {
        if let Err(err) = self.audit.record(record).await {
            warn!(error = %err, "failed to record audit entry");
        }
    }
}
