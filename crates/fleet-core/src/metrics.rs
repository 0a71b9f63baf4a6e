//! Prometheus metrics for the orchestration core.
//!
//! The metrics surface is pull-based: counters and gauges are updated
//! inline by the executor, orchestrator, poller, and stream fanout, and
//! rendered on demand in the text exposition format.

use std::sync::Arc;

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

/// Metrics registry for the fleet core.
pub struct Metrics {
    registry: Registry,
    /// Jobs that completed successfully.
    pub jobs_success: IntCounter,
    /// Jobs that terminated in failure.
    pub jobs_fail: IntCounter,
    /// End-to-end duration of a single job execution.
    pub jobs_duration: Histogram,
    /// Currently open push-stream connections.
    pub stream_connections: IntGauge,
    /// Binary health signal per device: 1 = online, 0 = offline.
    pub device_online: IntGaugeVec,
    /// Command and probe failures per device per short reason label.
    pub device_failures: IntCounterVec,
}

impl Metrics {
    /// Create a metrics registry with all fleet collectors registered.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let jobs_success =
            IntCounter::with_opts(Opts::new("fleet_jobs_success_total", "Jobs ok"))?;
        let jobs_fail = IntCounter::with_opts(Opts::new("fleet_jobs_fail_total", "Jobs failed"))?;
        let jobs_duration = Histogram::with_opts(
            HistogramOpts::new("fleet_jobs_duration_seconds", "Job duration")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let stream_connections = IntGauge::with_opts(Opts::new(
            "fleet_stream_connections",
            "Open push-stream connections",
        ))?;
        let device_online = IntGaugeVec::new(
            Opts::new("fleet_device_online", "Online=1 Offline=0"),
            &["device_id"],
        )?;
        let device_failures = IntCounterVec::new(
            Opts::new(
                "fleet_device_failures_total",
                "Command and probe failures by device and reason",
            ),
            &["device_id", "reason"],
        )?;

        registry.register(Box::new(jobs_success.clone()))?;
        registry.register(Box::new(jobs_fail.clone()))?;
        registry.register(Box::new(jobs_duration.clone()))?;
        registry.register(Box::new(stream_connections.clone()))?;
        registry.register(Box::new(device_online.clone()))?;
        registry.register(Box::new(device_failures.clone()))?;

        Ok(Self {
            registry,
            jobs_success,
            jobs_fail,
            jobs_duration,
            stream_connections,
            device_online,
            device_failures,
        })
    }

    /// Start a timer observing into the job duration histogram.
    pub fn job_timer(&self) -> HistogramTimer {
        self.jobs_duration.start_timer()
    }

    /// Record a single-device job outcome and flip the per-device health
    /// signal gauge. The gauge is observational only, it never gates
    /// further attempts.
    pub fn record_job_outcome(&self, device_id: &str, success: bool) {
        if success {
            self.jobs_success.inc();
        } else {
            self.jobs_fail.inc();
        }
        self.set_device_online(device_id, success);
    }

    /// Set the per-device online gauge.
    pub fn set_device_online(&self, device_id: &str, online: bool) {
        self.device_online
            .with_label_values(&[device_id])
            .set(if online { 1 } else { 0 });
    }

    /// Count a command or probe failure under a short reason label.
    pub fn record_device_failure(&self, device_id: &str, reason: &str) {
        self.device_failures
            .with_label_values(&[device_id, reason])
            .inc();
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

/// Shared metrics handle.
pub type SharedMetrics = Arc<Metrics>;
