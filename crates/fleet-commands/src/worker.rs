//! Background worker loop.
//!
//! One interval-driven task drains a batch of pending jobs and then runs a
//! health poll cycle. Errors from either phase are logged and the loop
//! keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use fleet_devices::{DeviceHttp, HealthPoller};

use crate::executor::JobExecutor;

/// Interval-driven job and health worker.
pub struct Worker {
    executor: Arc<JobExecutor>,
    poller: Arc<HealthPoller<DeviceHttp>>,
    poll_interval: Duration,
    running: Arc<RwLock<bool>>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl Worker {
    /// Create a worker ticking at `poll_interval`.
    pub fn new(
        executor: Arc<JobExecutor>,
        poller: Arc<HealthPoller<DeviceHttp>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            executor,
            poller,
            poll_interval,
            running: Arc::new(RwLock::new(false)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the worker loop. A second start on a running worker is a
    /// no-op.
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            return;
        }
        *running = true;
        drop(running);

        let executor = self.executor.clone();
        let poller = self.poller.clone();
        let running_flag = self.running.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            info!(interval_ms = poll_interval.as_millis() as u64, "worker started");

            loop {
                interval.tick().await;

                if !*running_flag.read().await {
                    break;
                }

                if let Err(err) = executor.run_pending_batch().await {
                    warn!(error = %err, "job batch failed");
                }
                if let Err(err) = poller.poll_once().await {
                    warn!(error = %err, "poll cycle failed");
                }
            }
            info!("worker stopped");
        });

        let mut task = self.task_handle.write().await;
        *task = Some(handle);
    }

    /// Stop the worker loop and wait for the task to finish its current
    /// tick.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        drop(running);

        let mut task = self.task_handle.write().await;
        if let Some(handle) = task.take() {
            drop(task);
            handle.abort();
            handle.await.ok();
        }
    }

    /// Check whether the worker loop is active.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
